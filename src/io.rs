//! Little-endian binary (de)serialization helpers shared by every artifact
//! writer/reader (`spec.md` §6's file layouts).
//!
//! The original tool wrote raw `fwrite`s of C structs; here each layout is a
//! sequence of explicit primitive reads/writes so the format is independent
//! of host struct padding.

use std::io::{self, Read, Write};

/// Write a `u32` (host-order `i32`/`u32` fields in `spec.md` §6 are written
/// as 4-byte little-endian).
pub fn write_u32<W: Write>(w: &mut W, v: u32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

/// Write an `i32`.
pub fn write_i32<W: Write>(w: &mut W, v: i32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

/// Write a `u64`.
pub fn write_u64<W: Write>(w: &mut W, v: u64) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

/// Write an `i64`.
pub fn write_i64<W: Write>(w: &mut W, v: i64) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

/// Write a `bool` as one byte.
pub fn write_bool<W: Write>(w: &mut W, v: bool) -> io::Result<()> {
    w.write_all(&[v as u8])
}

/// Write a slice of `u32`s.
pub fn write_u32_slice<W: Write>(w: &mut W, v: &[u32]) -> io::Result<()> {
    for &x in v {
        write_u32(w, x)?;
    }
    Ok(())
}

/// Write a slice of `i32`s.
pub fn write_i32_slice<W: Write>(w: &mut W, v: &[i32]) -> io::Result<()> {
    for &x in v {
        write_i32(w, x)?;
    }
    Ok(())
}

/// Write a slice of `u8`s (already byte-sized, but routed through here for
/// symmetry with the other `write_*_slice` helpers).
pub fn write_u8_slice<W: Write>(w: &mut W, v: &[u8]) -> io::Result<()> {
    w.write_all(v)
}

/// Write a slice of `bool`s, one byte each.
pub fn write_bool_slice<W: Write>(w: &mut W, v: &[bool]) -> io::Result<()> {
    let bytes: Vec<u8> = v.iter().map(|&b| b as u8).collect();
    w.write_all(&bytes)
}

/// Read a `u32`.
pub fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read an `i32`.
pub fn read_i32<R: Read>(r: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

/// Read a `u64`.
pub fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read an `i64`.
pub fn read_i64<R: Read>(r: &mut R) -> io::Result<i64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

/// Read a `bool` stored as one byte.
pub fn read_bool<R: Read>(r: &mut R) -> io::Result<bool> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0] != 0)
}

/// Read `n` `u32`s.
pub fn read_u32_vec<R: Read>(r: &mut R, n: usize) -> io::Result<Vec<u32>> {
    (0..n).map(|_| read_u32(r)).collect()
}

/// Read `n` `i32`s.
pub fn read_i32_vec<R: Read>(r: &mut R, n: usize) -> io::Result<Vec<i32>> {
    (0..n).map(|_| read_i32(r)).collect()
}

/// Read `n` bytes.
pub fn read_u8_vec<R: Read>(r: &mut R, n: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// Read `n` `bool`s, one byte each.
pub fn read_bool_vec<R: Read>(r: &mut R, n: usize) -> io::Result<Vec<bool>> {
    let bytes = read_u8_vec(r, n)?;
    Ok(bytes.into_iter().map(|b| b != 0).collect())
}
