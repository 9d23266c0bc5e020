use crate::error::NodeError;

/// Half-byte path representation (256 -> 16 possible values for trie sparsity).
///
/// Keys of any byte length convert to twice as many nibbles; the empty key is
/// a valid zero-nibble path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nibbles {
    pub nibbles: Vec<u8>,
}

impl Nibbles {
    pub fn new(nibbles: Vec<u8>) -> Self {
        Nibbles { nibbles }
    }

    pub fn from_bytes(bytes: &[u8]) -> Nibbles {
        let mut nibbles = Vec::with_capacity(bytes.len() * 2);
        for byte in bytes {
            nibbles.push(byte >> 4); // extracts the higher 4 bits
            nibbles.push(byte & 0x0f); // extracts the lower 4 bits
        }
        Nibbles { nibbles }
    }

    pub fn len(&self) -> usize {
        self.nibbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nibbles.is_empty()
    }

    pub fn merge(&self, other: &Nibbles) -> Nibbles {
        let mut merged_nibbles = self.nibbles.clone();
        merged_nibbles.extend_from_slice(&other.nibbles);
        Nibbles {
            nibbles: merged_nibbles,
        }
    }

    /// Prepend a single nibble, used when a collapsing branch hands its slot
    /// index back to the surviving child.
    pub fn prepend(nibble: u8, rest: &[u8]) -> Nibbles {
        let mut nibbles = Vec::with_capacity(rest.len() + 1);
        nibbles.push(nibble);
        nibbles.extend_from_slice(rest);
        Nibbles { nibbles }
    }

    /// Longest common prefix length.
    pub fn lcp_len(&self, other: &[u8]) -> usize {
        let n = self.nibbles.len().min(other.len());
        for i in 0..n {
            if self.nibbles[i] != other[i] {
                return i;
            }
        }
        n
    }

    /// Hex-prefix compact encoding: a flag nibble discriminates leaf from
    /// extension and odd from even length, even paths pad with a zero nibble
    /// so the result always packs into whole bytes.
    ///
    /// flag 0 = extension/even, 1 = extension/odd, 2 = leaf/even, 3 = leaf/odd
    pub fn hex_prefix(&self, is_leaf: bool) -> Vec<u8> {
        let odd = (self.nibbles.len() % 2) as u8;
        let flag = if is_leaf { 0x02 } else { 0x00 } + odd;

        let mut path_nibbles = Vec::with_capacity(self.nibbles.len() + 2);
        path_nibbles.push(flag);
        if odd == 0 {
            path_nibbles.push(0x00);
        }
        path_nibbles.extend_from_slice(&self.nibbles);

        let mut encoded = Vec::with_capacity(path_nibbles.len() / 2);
        for pair in path_nibbles.chunks(2) {
            encoded.push(pair[0] << 4 | pair[1]);
        }
        encoded
    }

    /// Inverse of [`hex_prefix`]: returns the path and whether the flag marks
    /// a leaf. Rejects flag nibbles above 3 and, for even-length paths, a
    /// nonzero pad nibble (every path must have exactly one encoding).
    pub fn from_hex_prefix(encoded: &[u8]) -> Result<(Nibbles, bool), NodeError> {
        let nibbles = Nibbles::from_bytes(encoded).nibbles;

        if nibbles.is_empty() {
            return Err(NodeError::EmptyPath);
        }

        let flag = nibbles[0];
        if flag > 0x03 {
            return Err(NodeError::BadFlag(flag));
        }

        if flag % 2 == 0 {
            if nibbles[1] != 0 {
                return Err(NodeError::BadPadding(nibbles[1]));
            }
            Ok((Nibbles::new(nibbles[2..].to_vec()), flag >= 0x02))
        } else {
            Ok((Nibbles::new(nibbles[1..].to_vec()), flag >= 0x02))
        }
    }
}

impl From<&[u8]> for Nibbles {
    fn from(bytes: &[u8]) -> Self {
        Nibbles::from_bytes(bytes)
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use rand::random;

    #[test]
    fn key_to_nibbles_conversion() {
        let key = random::<[u8; 32]>();
        let path = Nibbles::from_bytes(&key);

        assert_eq!(path.len(), 64);

        for (i, byte) in key.iter().enumerate() {
            assert_eq!(path.nibbles[i * 2], byte >> 4);
            assert_eq!(path.nibbles[i * 2 + 1], byte & 0x0f);
        }
    }

    #[test]
    fn empty_key_is_empty_path() {
        let path = Nibbles::from_bytes(b"");
        assert!(path.is_empty());
    }

    #[test]
    fn lcp_len_identical_slices() {
        let a = Nibbles::new(vec![1, 2, 3, 4]);
        assert_eq!(a.lcp_len(&[1, 2, 3, 4]), 4);
    }

    #[test]
    fn lcp_len_partial_match() {
        let a = Nibbles::new(vec![1, 2, 3, 4]);
        assert_eq!(a.lcp_len(&[1, 2, 5, 6]), 2);
    }

    #[test]
    fn lcp_len_no_match() {
        let a = Nibbles::new(vec![1, 2, 3, 4]);
        assert_eq!(a.lcp_len(&[5, 6, 7, 8]), 0);
    }

    #[test]
    fn lcp_len_different_lengths() {
        let a = Nibbles::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(a.lcp_len(&[1, 2, 3]), 3);
    }

    #[test]
    fn hex_prefix_known_vectors() {
        let cases: [(Vec<u8>, bool, Vec<u8>); 4] = [
            (vec![0x1, 0x2, 0x3, 0x4, 0x5], false, vec![0x11, 0x23, 0x45]),
            (
                vec![0x0, 0x1, 0x2, 0x3, 0x4, 0x5],
                false,
                vec![0x00, 0x01, 0x23, 0x45],
            ),
            (
                vec![0x0, 0xf, 0x1, 0xc, 0xb, 0x8],
                true,
                vec![0x20, 0x0f, 0x1c, 0xb8],
            ),
            (vec![0xf, 0x1, 0xc, 0xb, 0x8], true, vec![0x3f, 0x1c, 0xb8]),
        ];

        for (nibbles, is_leaf, expected) in cases {
            let path = Nibbles::new(nibbles);
            let encoded = path.hex_prefix(is_leaf);
            assert_eq!(encoded, expected);

            let (decoded, leaf_flag) = Nibbles::from_hex_prefix(&encoded).unwrap();
            assert_eq!(decoded, path);
            assert_eq!(leaf_flag, is_leaf);
        }
    }

    #[test]
    fn hex_prefix_empty_path() {
        let path = Nibbles::new(vec![]);
        assert_eq!(path.hex_prefix(true), vec![0x20]);
        assert_eq!(path.hex_prefix(false), vec![0x00]);

        let (decoded, is_leaf) = Nibbles::from_hex_prefix(&[0x20]).unwrap();
        assert!(decoded.is_empty());
        assert!(is_leaf);
    }

    #[test]
    fn from_hex_prefix_rejects_bad_flag() {
        assert_eq!(
            Nibbles::from_hex_prefix(&[0x40]),
            Err(NodeError::BadFlag(0x04))
        );
    }

    #[test]
    fn from_hex_prefix_rejects_nonzero_padding() {
        // leaf/even with pad nibble 1 instead of 0
        assert_eq!(
            Nibbles::from_hex_prefix(&[0x21]),
            Err(NodeError::BadPadding(0x01))
        );
        // extension/even with pad nibble 1
        assert_eq!(
            Nibbles::from_hex_prefix(&[0x01, 0x23]),
            Err(NodeError::BadPadding(0x01))
        );
        // odd-length encodings have no pad nibble to check
        let (decoded, is_leaf) = Nibbles::from_hex_prefix(&[0x31]).unwrap();
        assert_eq!(decoded.nibbles, vec![0x1]);
        assert!(is_leaf);
    }

    #[test]
    fn from_hex_prefix_rejects_empty_input() {
        assert_eq!(Nibbles::from_hex_prefix(&[]), Err(NodeError::EmptyPath));
    }

    #[test]
    fn prepend_extends_path() {
        let merged = Nibbles::prepend(0x7, &[1, 2, 3]);
        assert_eq!(merged.nibbles, vec![7, 1, 2, 3]);
    }
}
