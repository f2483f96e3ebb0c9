/// Runtime commands accepted from the keyboard and the control channel.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command {
    TogglePause,
    ToggleLap,
    Increment,
    Reset,
    Quit,
}

impl Command {
    /// Maps a single input byte to a command. Unknown bytes are ignored.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte.to_ascii_lowercase() {
            b'p' | b' ' => Some(Command::TogglePause),
            b'l' => Some(Command::ToggleLap),
            b'+' => Some(Command::Increment),
            b'r' => Some(Command::Reset),
            b'q' => Some(Command::Quit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_command_characters_case_insensitively() {
        assert_eq!(Command::from_byte(b'p'), Some(Command::TogglePause));
        assert_eq!(Command::from_byte(b'P'), Some(Command::TogglePause));
        assert_eq!(Command::from_byte(b' '), Some(Command::TogglePause));
        assert_eq!(Command::from_byte(b'L'), Some(Command::ToggleLap));
        assert_eq!(Command::from_byte(b'+'), Some(Command::Increment));
        assert_eq!(Command::from_byte(b'R'), Some(Command::Reset));
        assert_eq!(Command::from_byte(b'Q'), Some(Command::Quit));
    }

    #[test]
    fn unknown_input_is_a_no_op() {
        for byte in [b'x', b'\n', b'0', 0x1b, b'-'] {
            assert_eq!(Command::from_byte(byte), None);
        }
    }
}
