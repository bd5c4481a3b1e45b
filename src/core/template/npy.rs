//! NumPy `.npy` v1.0 encoding for little-endian f32 arrays.

use crate::core::pose::PoseError;

const MAGIC: &[u8] = b"\x93NUMPY";
const ALIGN: usize = 64;

fn element_count(shape: &[usize]) -> Result<usize, PoseError> {
    shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| PoseError::Archive(format!("npy shape {:?} overflows", shape)))
}

fn byte_len(shape: &[usize]) -> Result<usize, PoseError> {
    element_count(shape)?
        .checked_mul(4)
        .ok_or_else(|| PoseError::Archive(format!("npy shape {:?} overflows", shape)))
}

pub fn encode_f32(shape: &[usize], data: &[f32]) -> Result<Vec<u8>, PoseError> {
    let expected = element_count(shape)?;
    if expected != data.len() {
        return Err(PoseError::Archive(format!(
            "shape {:?} needs {} values, got {}",
            shape,
            expected,
            data.len()
        )));
    }

    let mut header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': {}, }}",
        shape_literal(shape)
    );
    // magic(6) + version(2) + len(2) + header，总长对齐到 64 字节，以 '\n' 结尾
    let unpadded = MAGIC.len() + 4 + header.len() + 1;
    let padding = (ALIGN - unpadded % ALIGN) % ALIGN;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let header_len = u16::try_from(header.len())
        .map_err(|_| PoseError::Archive(format!("npy header too long for shape {:?}", shape)))?;

    let mut out = Vec::with_capacity(MAGIC.len() + 4 + header.len() + data.len() * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for value in data {
        out.extend_from_slice(&value.to_le_bytes());
    }
    Ok(out)
}

fn shape_literal(shape: &[usize]) -> String {
    match shape {
        [single] => format!("({},)", single),
        dims => format!(
            "({})",
            dims.iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Decode a `<f4` C-order array, returning its shape and values.
pub fn decode_f32(bytes: &[u8]) -> Result<(Vec<usize>, Vec<f32>), PoseError> {
    if bytes.len() < MAGIC.len() + 4 || &bytes[..MAGIC.len()] != MAGIC {
        return Err(PoseError::Archive("not an npy array".into()));
    }

    let major = bytes[MAGIC.len()];
    let (header_start, header_len) = match major {
        1 => {
            let len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
            (10, len)
        }
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(PoseError::Archive("truncated npy header".into()));
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
            (12, len)
        }
        v => return Err(PoseError::Archive(format!("unsupported npy version {}", v))),
    };

    let header_end = header_start + header_len;
    let header = bytes
        .get(header_start..header_end)
        .and_then(|h| std::str::from_utf8(h).ok())
        .ok_or_else(|| PoseError::Archive("truncated npy header".into()))?;

    if !header.contains("'descr': '<f4'") {
        return Err(PoseError::Archive(format!("unsupported dtype in header {}", header.trim())));
    }
    if header.contains("'fortran_order': True") {
        return Err(PoseError::Archive("fortran order arrays are not supported".into()));
    }
    let shape = parse_shape(header)?;

    let needed = byte_len(&shape)?;
    let body = &bytes[header_end..];
    if body.len() != needed {
        return Err(PoseError::Archive(format!(
            "npy body has {} bytes, shape {:?} needs {}",
            body.len(),
            shape,
            needed
        )));
    }

    let data = body
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok((shape, data))
}

fn parse_shape(header: &str) -> Result<Vec<usize>, PoseError> {
    let missing = || PoseError::Archive(format!("no shape in npy header {}", header.trim()));

    let start = header.find("'shape':").ok_or_else(missing)?;
    let rest = &header[start..];
    let open = rest.find('(').ok_or_else(missing)?;
    let close = rest.find(')').ok_or_else(missing)?;

    rest[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| PoseError::Archive(format!("bad shape dimension '{}'", s)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_is_aligned() {
        let bytes = encode_f32(&[2, 33, 2], &vec![0.5; 132]).unwrap();
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;

        assert_eq!((10 + header_len) % 64, 0);
        assert_eq!(bytes[10 + header_len - 1], b'\n');
        assert_eq!(bytes.len(), 10 + header_len + 132 * 4);

        let header = std::str::from_utf8(&bytes[10..10 + header_len]).unwrap();
        assert!(header
            .starts_with("{'descr': '<f4', 'fortran_order': False, 'shape': (2, 33, 2), }"));
    }

    #[test]
    fn test_decode_recovers_values() {
        let values: Vec<f32> = (0..66).map(|i| i as f32 * -0.25).collect();
        let bytes = encode_f32(&[1, 33, 2], &values).unwrap();
        let (shape, data) = decode_f32(&bytes).unwrap();

        assert_eq!(shape, vec![1, 33, 2]);
        assert_eq!(data, values);
    }

    #[test]
    fn test_one_dimensional_shape_literal() {
        let bytes = encode_f32(&[3], &[1.0, 2.0, 3.0]).unwrap();
        let (shape, _) = decode_f32(&bytes).unwrap();
        assert_eq!(shape, vec![3]);
        assert_eq!(shape_literal(&[3]), "(3,)");
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        assert!(matches!(encode_f32(&[2, 2], &[1.0]), Err(PoseError::Archive(_))));
    }

    #[test]
    fn test_decode_rejects_other_dtypes() {
        let mut bytes = encode_f32(&[1], &[1.0]).unwrap();
        let pos = bytes.windows(3).position(|w| w == b"<f4").unwrap();
        bytes[pos + 1] = b'i';
        assert!(matches!(decode_f32(&bytes), Err(PoseError::Archive(_))));

        assert!(decode_f32(b"garbage").is_err());
    }

    #[test]
    fn test_decode_rejects_overflowing_shape() {
        let header = format!(
            "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}, 2), }}\n",
            usize::MAX,
            usize::MAX
        );
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&[0; 8]);

        assert!(matches!(decode_f32(&bytes), Err(PoseError::Archive(_))));

        // 元素数不溢出，但字节数溢出
        let header = format!(
            "{{'descr': '<f4', 'fortran_order': False, 'shape': ({},), }}\n",
            usize::MAX / 2
        );
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());

        assert!(matches!(decode_f32(&bytes), Err(PoseError::Archive(_))));
    }

    #[test]
    fn test_encode_rejects_overflowing_shape() {
        let result = encode_f32(&[usize::MAX, 2], &[]);
        assert!(matches!(result, Err(PoseError::Archive(_))));
    }
}
