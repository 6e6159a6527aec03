const SHIFT: u8 = 3;
const ALPHABET_LEN: u8 = 26;

/// What the module does to the message. On the wire `1` is encrypt and any
/// other value decrypts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Decrypt,
    Encrypt,
}

impl Operation {
    #[must_use]
    pub const fn from_wire(value: u32) -> Self {
        if value == 1 { Self::Encrypt } else { Self::Decrypt }
    }

    #[must_use]
    pub const fn to_wire(self) -> u32 {
        match self {
            Self::Decrypt => 0,
            Self::Encrypt => 1,
        }
    }
}

/// Upper-case `message` and shift its ASCII letters by three places.
///
/// Everything that is not a letter passes through unchanged.
#[must_use]
pub fn caesar_shift(message: &[u8], operation: Operation) -> Vec<u8> {
    let offset = match operation {
        Operation::Encrypt => SHIFT,
        Operation::Decrypt => ALPHABET_LEN - SHIFT,
    };
    message
        .iter()
        .map(|b| {
            let c = b.to_ascii_uppercase();
            if c.is_ascii_uppercase() {
                b'A' + (c - b'A' + offset) % ALPHABET_LEN
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Operation, caesar_shift};

    #[test]
    fn encrypt_upper_cases_and_shifts() {
        assert_eq!(
            caesar_shift(b"Hello World.", Operation::Encrypt),
            b"KHOOR ZRUOG."
        );
    }

    #[test]
    fn decrypt_reverses() {
        assert_eq!(
            caesar_shift(b"Khoor Zruog.", Operation::Decrypt),
            b"HELLO WORLD."
        );
    }

    #[test]
    fn shifts_wrap_around_the_alphabet() {
        assert_eq!(caesar_shift(b"xyz", Operation::Encrypt), b"ABC");
        assert_eq!(caesar_shift(b"ABC", Operation::Decrypt), b"XYZ");
    }

    #[test]
    fn non_letters_pass_through() {
        let input = b"0123 !?\xC3\xA9";
        assert_eq!(caesar_shift(input, Operation::Encrypt), input);
        assert!(caesar_shift(b"", Operation::Decrypt).is_empty());
    }

    #[test]
    fn only_one_selects_encryption() {
        assert_eq!(Operation::from_wire(1), Operation::Encrypt);
        assert_eq!(Operation::from_wire(0), Operation::Decrypt);
        assert_eq!(Operation::from_wire(7), Operation::Decrypt);
        assert_eq!(Operation::Encrypt.to_wire(), 1);
    }
}
