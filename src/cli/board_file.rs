//! Board file loading.

use super::CliError;
use serde::Deserialize;
use stackcity::board::Card;
use std::fs;
use std::path::Path;

/// On-disk board: an ordered list of placed cards.
#[derive(Debug, Deserialize)]
struct BoardFile {
    cards: Vec<Card>,
}

/// Load the placement list from a board JSON file.
pub(super) fn load_board(path: &Path) -> Result<Vec<Card>, CliError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::new(format!("Failed to read {}: {e}", path.display())))?;
    let board: BoardFile = serde_json::from_str(&text)
        .map_err(|e| CliError::new(format!("Invalid board file {}: {e}", path.display())))?;
    Ok(board.cards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackcity::board::{CardId, ZoneType};
    use std::io::Write;

    #[test]
    fn test_load_board_round_trip() {
        let cards = vec![
            Card::uniform(CardId(1), 0, 0, &ZoneType::residential()),
            Card::uniform(CardId(2), 1, 0, &ZoneType::park()),
        ];
        let json = serde_json::json!({ "cards": cards }).to_string();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let loaded = load_board(file.path()).unwrap();
        assert_eq!(loaded, cards);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_board(Path::new("/nonexistent/board.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/board.json"));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"cards\": [{\"id\": 1}]}").unwrap();
        assert!(load_board(file.path()).is_err());
    }
}
