use crate::beatmap::BeatmapSet;
use std::io::{self, BufRead, Write};

/// Yes/no questions the download flow needs answered.
///
/// Every answer defaults to "no" when the user gives none.
pub trait Prompter: Send + Sync {
    /// Start a download requested through a deep link?
    fn confirm_download(&self, set: &BeatmapSet) -> bool;

    /// The set is already in the library; download it again?
    fn confirm_redownload(&self, set: &BeatmapSet) -> bool;

    /// The official servers refuse this set; fetch it from the mirror instead?
    fn confirm_mirror_fallback(&self, set: &BeatmapSet) -> bool;
}

/// Asks on stderr and reads the answer from stdin
pub struct TerminalPrompter {
    assume_yes: bool,
}

impl TerminalPrompter {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }

    fn ask(&self, question: &str) -> bool {
        if self.assume_yes {
            tracing::debug!("Auto-confirmed: {}", question);
            return true;
        }

        eprint!("{} [y/N] ", question);
        let _ = io::stderr().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => parse_answer(&line),
            Err(e) => {
                tracing::warn!("Could not read confirmation: {}", e);
                false
            }
        }
    }
}

impl Prompter for TerminalPrompter {
    fn confirm_download(&self, set: &BeatmapSet) -> bool {
        self.ask(&format!("Download {} (mapped by {})?", set.friendly_name(), set.mapper))
    }

    fn confirm_redownload(&self, set: &BeatmapSet) -> bool {
        self.ask(&format!(
            "You already have {} in your library. Download it again?",
            set.friendly_name()
        ))
    }

    fn confirm_mirror_fallback(&self, set: &BeatmapSet) -> bool {
        self.ask(&format!(
            "{} is no longer available from the official servers. Try the mirror instead?",
            set.friendly_name()
        ))
    }
}

fn parse_answer(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert!(parse_answer("y\n"));
        assert!(parse_answer("  YES "));
        assert!(!parse_answer("\n"));
        assert!(!parse_answer("no"));
        assert!(!parse_answer("yep"));
    }

    #[test]
    fn test_assume_yes_skips_stdin() {
        let prompter = TerminalPrompter::new(true);
        let set = BeatmapSet {
            id: 1,
            backend: crate::beatmap::Backend::Official,
            artist: "a".to_string(),
            title: "t".to_string(),
            mapper: "m".to_string(),
            preview_image: String::new(),
            preview_audio: String::new(),
            already_have: true,
        };
        assert!(prompter.confirm_download(&set));
        assert!(prompter.confirm_redownload(&set));
        assert!(prompter.confirm_mirror_fallback(&set));
    }
}
