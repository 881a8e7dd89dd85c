//! `mega vote-many`: an unsigned batch vote read from a JSON file.

use std::path::Path;

use anyhow::{Context, Result};
use mega_client::VoteEntry;

use super::{Settings, print_json};

pub fn run(settings: &Settings, file: &Path) -> Result<()> {
    let votes = read_votes(file)?;
    let client = settings.client()?;
    let payload = client.vote_many(&votes)?;
    print_json(&payload)
}

fn read_votes(file: &Path) -> Result<Vec<VoteEntry>> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read votes: {}", file.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse votes: {}", file.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_vote_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("votes.json");
        std::fs::write(
            &path,
            r#"[
                {"for": true, "proposal": "SP3D6PV2ACBPEKYJTCMH7HEN02KP87QSP8KTEH335.mdp-1"},
                {"for": false, "proposal": "SP3D6PV2ACBPEKYJTCMH7HEN02KP87QSP8KTEH335.mdp-2",
                 "delegator": "SP143YHR805B8S834BWJTMZVFR1WP5FFC03WZE4BF"}
            ]"#,
        )
        .unwrap();

        let votes = read_votes(&path).unwrap();
        assert_eq!(votes.len(), 2);
        assert!(votes[0].is_for);
        assert!(votes[0].delegator.is_none());
        assert_eq!(
            votes[1].delegator.as_deref(),
            Some("SP143YHR805B8S834BWJTMZVFR1WP5FFC03WZE4BF")
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(read_votes(&tmp.path().join("absent.json")).is_err());
    }
}
