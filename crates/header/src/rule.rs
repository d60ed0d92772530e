use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::{Read, Write};

/// Comparison applied by [`Test::Size`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeOp {
    Equal,
    Less,
    Greater,
}

/// One condition of a [`Rule`]. A test passes when its outcome equals
/// `result`, so `result: false` expresses "must not".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Test {
    /// The bytes at `offset` equal `value`.
    Data { offset: usize, value: Vec<u8>, result: bool },
    /// The whole file's size compares to `size` by `op`.
    Size { size: u64, op: SizeOp, result: bool },
}

impl Test {
    fn passes(&self, head: &[u8], total_size: u64) -> bool {
        match self {
            Test::Data { offset, value, result } => {
                let found = head.get(*offset..offset + value.len()) == Some(value.as_slice());
                found == *result
            },
            Test::Size { size, op, result } => {
                let found = match op {
                    SizeOp::Equal => total_size == *size,
                    SizeOp::Less => total_size < *size,
                    SizeOp::Greater => total_size > *size,
                };
                found == *result
            },
        }
    }

    /// Leading bytes needed to evaluate this test.
    fn head_len(&self) -> usize {
        match self {
            Test::Data { offset, value, .. } => offset + value.len(),
            Test::Size { .. } => 0,
        }
    }
}

/// A header layout: how to recognise it and how many bytes it occupies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    /// Bytes stripped from the front of the file.
    pub start_offset: u64,
    pub tests: Vec<Test>,
}

impl Rule {
    /// A rule for a header identified by `magic` at `offset` and occupying the
    /// first `strip` bytes. The file must be larger than the header.
    pub fn headered(name: impl Into<String>, offset: usize, magic: &[u8], strip: u64) -> Self {
        Self {
            name: name.into(),
            start_offset: strip,
            tests: vec![
                Test::Data { offset, value: magic.to_vec(), result: true },
                Test::Size { size: strip, op: SizeOp::Greater, result: true },
            ],
        }
    }

    /// Whether every test passes against the leading bytes of a file.
    #[must_use]
    pub fn matches(&self, head: &[u8], total_size: u64) -> bool {
        self.tests.iter().all(|test| test.passes(head, total_size))
    }

    /// Leading bytes needed to evaluate every test.
    #[must_use]
    pub fn head_len(&self) -> usize {
        self.tests.iter().map(Test::head_len).max().unwrap_or(0)
    }

    /// Copy `input` to `output` without the header, returning the number of
    /// bytes written.
    pub fn transform<R: Read, W: Write>(&self, mut input: R, mut output: W) -> Result<u64> {
        let skipped = std::io::copy(&mut (&mut input).take(self.start_offset), &mut std::io::sink())
            .or_raise(|| ErrorKind::Io)?;
        if skipped < self.start_offset {
            exn::bail!(ErrorKind::Truncated { expected: self.start_offset, actual: skipped });
        }
        let written = std::io::copy(&mut input, &mut output).or_raise(|| ErrorKind::Io)?;
        output.flush().or_raise(|| ErrorKind::Io)?;
        tracing::debug!(rule = %self.name, stripped = skipped, bytes = written, "Stripped header");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"NES\x1a", 100, true)]
    #[case(b"NES\x1b", 100, false)]
    #[case(b"NE", 100, false)]
    #[case(b"NES\x1a", 16, false)]
    fn test_headered_matches(#[case] head: &[u8], #[case] size: u64, #[case] expected: bool) {
        let rule = Rule::headered("nes", 0, b"NES\x1a", 16);
        assert_eq!(rule.matches(head, size), expected);
    }

    #[rstest]
    #[case(SizeOp::Equal, 512, true)]
    #[case(SizeOp::Equal, 513, false)]
    #[case(SizeOp::Less, 511, true)]
    #[case(SizeOp::Greater, 511, false)]
    fn test_size_op(#[case] op: SizeOp, #[case] total: u64, #[case] expected: bool) {
        let test = Test::Size { size: 512, op, result: true };
        assert_eq!(test.passes(&[], total), expected);
    }

    #[test]
    fn test_negated_data() {
        let rule = Rule {
            name: "not-blank".to_string(),
            start_offset: 0,
            tests: vec![Test::Data { offset: 2, value: vec![0, 0], result: false }],
        };
        assert!(rule.matches(b"\x01\x02\x03\x04", 4));
        assert!(!rule.matches(b"\x01\x02\x00\x00", 4));
        assert_eq!(rule.head_len(), 4);
    }

    #[test]
    fn test_transform_strips() {
        let rule = Rule::headered("lynx", 0, b"LYNX", 4);
        let mut out = Vec::new();
        assert_eq!(rule.transform(&b"LYNXpayload"[..], &mut out).unwrap(), 7);
        assert_eq!(out, b"payload");
    }

    #[test]
    fn test_transform_truncated() {
        let rule = Rule::headered("a7800", 1, b"ATARI7800", 128);
        let err = rule.transform(&b"\x01ATARI7800"[..], Vec::new()).unwrap_err();
        assert_eq!(*err, ErrorKind::Truncated { expected: 128, actual: 10 });
    }
}
