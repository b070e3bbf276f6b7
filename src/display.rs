//! Plain-text presentation of recommendation results.
//!
//! Nothing here computes anything; every function renders an already
//! computed result as 1-indexed `"<n>- <name>"` lines.

use std::io::{self, Write};

use crate::recommend::NamedRecommendations;
use crate::similarity::SimilarItems;

/// One `"<n>- <name>"` line per entry, starting at 1.
pub fn write_enumeration<W, S>(out: &mut W, names: &[S]) -> io::Result<()>
where
    W: Write,
    S: AsRef<str>,
{
    for (n, name) in names.iter().enumerate() {
        writeln!(out, "{}- {}", n + 1, name.as_ref())?;
    }
    Ok(())
}

pub fn write_user_recommendations<W: Write>(
    out: &mut W,
    recs: &NamedRecommendations,
    show_known: bool,
    show_recs: bool,
) -> io::Result<()> {
    if show_known {
        writeln!(out, "Known Likes:")?;
        write_enumeration(out, &recs.known)?;
    }
    if show_recs {
        writeln!(out, "\n Recommended Items:")?;
        write_enumeration(out, &recs.recommended)?;
    }
    Ok(())
}

pub fn write_similar_items<W: Write>(out: &mut W, similar: &SimilarItems) -> io::Result<()> {
    writeln!(out, "Item of interest: {}", similar.query)?;
    writeln!(out, "Similar items:")?;
    write_enumeration(out, &similar.similar)
}

/// [`write_user_recommendations`] to stdout.
pub fn print_user_recommendations(
    recs: &NamedRecommendations,
    show_known: bool,
    show_recs: bool,
) -> io::Result<()> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    write_user_recommendations(&mut lock, recs, show_known, show_recs)
}

/// [`write_similar_items`] to stdout.
pub fn print_similar_items(similar: &SimilarItems) -> io::Result<()> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    write_similar_items(&mut lock, similar)
}
