//! Computer keyboard → note names, three and a half octaves

/// Every note the key map can produce, low to high
pub const ALL_NOTES: [&str; 31] = [
    "C2", "D2", "E2", "F2", "G2", "A2", "B2", //
    "C3", "D3", "E3", "F3", "G3", "A3", "B3", //
    "C4", "D4", "E4", "F4", "G4", "A4", "B4", //
    "C5", "D5", "E5", "F5", "G5", "A5", "B5", //
    "C6", "D6", "E6",
];

/// Note played by `key`, if mapped
pub fn note_for_key(key: char) -> Option<&'static str> {
    let note = match key.to_ascii_lowercase() {
        // Number row
        '1' => "C5",
        '2' => "D5",
        '3' => "E5",
        '4' => "F5",
        '5' => "G5",
        '6' => "A5",
        '7' => "B5",
        '8' => "C6",
        '9' => "D6",
        '0' => "E6",
        // Top row
        'q' => "C4",
        'w' => "D4",
        'e' => "E4",
        'r' => "F4",
        't' => "G4",
        'y' => "A4",
        'u' => "B4",
        'i' => "C5",
        // Home row
        'a' => "C3",
        's' => "D3",
        'd' => "E3",
        'f' => "F3",
        'g' => "G3",
        'h' => "A3",
        'j' => "B3",
        'k' => "C4",
        'l' => "D4",
        // Bottom row
        'z' => "C2",
        'x' => "D2",
        'c' => "E2",
        'v' => "F2",
        'b' => "G2",
        'n' => "A2",
        'm' => "B2",
        _ => return None,
    };
    Some(note)
}

/// Accept either a mapped key (`q`) or a note name (`C4`)
pub fn resolve_note(input: &str) -> Option<&'static str> {
    let input = input.trim();
    let mut chars = input.chars();
    if let (Some(key), None) = (chars.next(), chars.next()) {
        return note_for_key(key);
    }
    ALL_NOTES
        .iter()
        .copied()
        .find(|note| note.eq_ignore_ascii_case(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows() {
        assert_eq!(note_for_key('q'), Some("C4"));
        assert_eq!(note_for_key('U'), Some("B4"));
        assert_eq!(note_for_key('i'), Some("C5"));
        assert_eq!(note_for_key('l'), Some("D4"));
        assert_eq!(note_for_key('z'), Some("C2"));
        assert_eq!(note_for_key('0'), Some("E6"));
        assert_eq!(note_for_key('p'), None);
    }

    #[test]
    fn test_every_mapped_note_is_released_on_start() {
        for key in "1234567890qwertyuiasdfghjklzxcvbnm".chars() {
            let note = note_for_key(key).unwrap();
            assert!(ALL_NOTES.contains(&note), "{} -> {}", key, note);
        }
    }

    #[test]
    fn test_resolve_note() {
        assert_eq!(resolve_note("e"), Some("E4"));
        assert_eq!(resolve_note("c6"), Some("C6"));
        assert_eq!(resolve_note("C7"), None);
    }
}
