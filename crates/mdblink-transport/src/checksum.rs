//! MDB additive checksum.

/// Sum of all bytes, keeping the low 8 bits.
///
/// ```
/// use mdblink_transport::mdb_checksum;
///
/// assert_eq!(mdb_checksum(&[0x10, 0x00]), 0x10);
/// assert_eq!(mdb_checksum(&[0xFF, 0x02]), 0x01);
/// ```
pub fn mdb_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// Copy `data` and append its checksum byte.
pub fn with_checksum(data: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(data.len() + 1);
    frame.extend_from_slice(data);
    frame.push(mdb_checksum(data));
    frame
}
