use std::io::{self, Write};

use crate::group_matcher::MatchedGroup;
use crate::metadata::{Album, TaggedFile};

/// Format milliseconds as m:ss.
pub fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Write an album header and its track list.
pub fn write_album<W: Write>(out: &mut W, album: &Album) -> io::Result<()> {
    writeln!(out, "{}", album)?;
    if let Some(released) = &album.released {
        writeln!(out, "  Released: {}", released)?;
    }
    if let Some(album_type) = &album.album_type {
        writeln!(out, "  Type:     {}", album_type)?;
    }
    for track in album.tracks() {
        writeln!(
            out,
            "  {:>3}. {:<40} {:>6}  {}",
            track.number,
            track.title,
            format_duration(track.duration_ms),
            track.artist.name
        )?;
    }
    Ok(())
}

/// Write the outcome of one group: the selected album, which file landed
/// on each track, and the files left over.
pub fn write_match_report<W: Write>(out: &mut W, matched: &MatchedGroup) -> io::Result<()> {
    let files = matched.group.files();

    let Some(album) = &matched.album else {
        writeln!(out, "Group \"{}\": no album found ({} files)", matched.group.name(), files.len())?;
        for file in files {
            writeln!(out, "    {}", file.path().display())?;
        }
        return Ok(());
    };

    writeln!(
        out,
        "Group \"{}\": {} (score {:.3})",
        matched.group.name(),
        album,
        matched.album_score
    )?;

    for track in album.tracks() {
        let mut matched_files = files
            .iter()
            .filter(|f| f.track().map_or(false, |t| t.id == track.id && t.album_id() == album.id))
            .peekable();

        if matched_files.peek().is_none() {
            writeln!(out, "  {:>3}. {:<40} <- (no file)", track.number, track.title)?;
        }
        for file in matched_files {
            writeln!(
                out,
                "  {:>3}. {:<40} <- {} ({:.3})",
                track.number,
                track.title,
                file.path().display(),
                file.score()
            )?;
        }
    }

    let unmatched: Vec<_> = files.iter().filter(|f| f.track().is_none()).collect();
    if !unmatched.is_empty() {
        writeln!(out, "  Unmatched files:")?;
        for file in unmatched {
            writeln!(out, "    {}", file.path().display())?;
        }
    }
    Ok(())
}

pub fn print_match_report(matched: &MatchedGroup) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_match_report(&mut out, matched)?;
    writeln!(out)
}
