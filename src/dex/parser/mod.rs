#[macro_use]
pub mod parse;

use std::{
	io,
	io::{Read, Seek, SeekFrom},
};

use color_eyre::{
	eyre::{bail, WrapErr},
	Result,
};
pub use parse::{Parse, ReadThings, Sleb128, Uleb128};
use thiserror::Error;

/// Error kinds surfaced while reading the DEX image or building the
/// symbol pools. Any of these aborts the load; no partial pool is
/// handed out.
#[derive(Debug, Error)]
pub enum ParseError {
	#[error("parsing failed: {0}")]
	GenericError(String),
	#[error("unexpected end of input")]
	TruncatedInput,
	#[error("LEB128 value too long or out of range")]
	MalformedLeb,
	#[error("{what} id {index} out of range (pool holds {len})")]
	IndexOutOfRange {
		what:  &'static str,
		index: usize,
		len:   usize,
	},
	#[error("malformed type descriptor {0:?}")]
	MalformedDescriptor(String),
	#[error("parsing failed: bad MUTF-8 byte {value:#04x} at offset {offset:#04x}")]
	BadUtf8 { value: u16, offset: usize },
	#[error("parsing failed with IO error")]
	Io(#[from] io::Error),
}

impl ParseError {
	pub fn generic<T: Into<String>>(msg: T) -> ParseError {
		ParseError::GenericError(msg.into())
	}

	pub fn bad_utf8(value: u16, offset: usize) -> ParseError {
		ParseError::BadUtf8 { value, offset }
	}

	pub fn index_out_of_range(what: &'static str, index: usize, len: usize) -> ParseError {
		ParseError::IndexOutOfRange { what, index, len }
	}
}

/// Positioned reader over a DEX image. Every section decoder drives one
/// of these: seek to the section offset, read `count` entries, restore.
pub trait Parser: Seek + ReadThings + Sized {
	#[inline(always)]
	fn align(&mut self, alignment: u32) -> Result<()> {
		let offset = self.get_offset();
		let align = offset % alignment;
		if align != 0 {
			self.set_offset(offset - align + alignment)?;
		}
		Ok(())
	}

	#[inline(always)]
	fn parse<T: Parse>(&mut self) -> Result<T> {
		T::parse(self)
	}

	#[cfg_attr(feature = "trace", instrument(skip(self)))]
	fn get_offset(&mut self) -> u32 {
		self.stream_position()
			.expect("there should always be a current position") as u32
	}

	#[cfg_attr(feature = "trace", instrument(skip(self)))]
	fn set_offset(&mut self, offset: u32) -> Result<()> {
		self.seek(SeekFrom::Start(offset as u64))
			.map(|_| ())
			.wrap_err("seeking to new offset")
	}

	#[cfg_attr(feature = "trace", instrument(skip(self)))]
	fn offset(&mut self, offset: u32) -> Result<&mut Self> {
		self.set_offset(offset)?;
		Ok(self)
	}

	/// Checkpoint/restore: runs `f` with the cursor moved to `offset`
	/// and puts the cursor back afterwards. An offset of 0 means the
	/// referenced item is absent.
	fn with_offset<T>(
		&mut self,
		offset: u32,
		f: impl FnOnce(&mut Self) -> Result<T>,
	) -> Result<Option<T>> {
		if offset == 0 {
			return Ok(None);
		}

		let old_offset = self.get_offset();
		self.set_offset(offset)?;
		let res = f(self)?;
		self.set_offset(old_offset)?;

		Ok(Some(res))
	}

	#[cfg_attr(feature = "trace", instrument(skip(self), fields(idx)))]
	fn parse_list<T: Parse>(&mut self, len: u32) -> Result<Vec<T>> {
		let mut res = Vec::with_capacity(len as usize);
		for _ in 0..len {
			res.push(self.parse()?)
		}
		Ok(res)
	}

	#[cfg_attr(feature = "trace", instrument(skip(self)))]
	fn parse_string(&mut self, len: u32) -> Result<String> {
		parse_utf8_bytes_utf16_len_string(self, len)
	}
}

/// DEX strings are MUTF-8: a uleb128 utf16 length followed by 1-3 byte
/// sequences, where U+0000 is encoded as 0xc0 0x80 and a bare zero byte
/// is illegal.
#[cfg_attr(feature = "trace", instrument(skip(p)))]
fn parse_utf8_bytes_utf16_len_string<P: Parser>(p: &mut P, len: u32) -> Result<String> {
	let mut chars: Vec<u16> = Vec::with_capacity(len as usize);

	let mut at = 0;
	for _ in 0..len {
		let v0 = p.u8()? as u16;
		let out = match v0 >> 4 {
			0x00..=0x07 => {
				// 0XXXXXXX -- single-byte encoding
				if v0 == 0 {
					// A single zero byte is illegal.
					bail!(ParseError::bad_utf8(v0, at));
				}
				at += 1;
				v0
			}
			0x0c..=0x0d => {
				// 110XXXXX -- two-byte encoding
				let v1 = p.u8()? as u16;
				if (v1 & 0xc0) != 0x80 {
					bail!(ParseError::bad_utf8(v1, at + 1));
				}
				let value = ((v0 & 0x1f) << 6) | (v1 & 0x3f);
				if value != 0 && value < 0x80 {
					// Should have been single-byte encoded.
					bail!(ParseError::bad_utf8(v1, at + 1));
				}
				at += 2;
				value
			}
			0x0e => {
				// 1110XXXX -- three-byte encoding
				let v1 = p.u8()? as u16;
				if (v1 & 0xc0) != 0x80 {
					bail!(ParseError::bad_utf8(v1, at + 1));
				}
				let v2 = p.u8()? as u16;
				if (v2 & 0xc0) != 0x80 {
					bail!(ParseError::bad_utf8(v2, at + 2));
				}
				let value = ((v0 & 0x0f) << 12) | ((v1 & 0x3f) << 6) | (v2 & 0x3f);
				if value < 0x800 {
					// Should have been one- or two-byte encoded.
					bail!(ParseError::bad_utf8(v2, at + 2));
				}
				at += 3;
				value
			}
			_ => bail!(ParseError::bad_utf8(v0, at)),
		};
		chars.push(out);
	}

	Ok(String::from_utf16_lossy(&chars))
}

pub struct FileParser<R: Read + Seek> {
	reader: R,
}

impl<R: Read + Seek> FileParser<R> {
	pub fn new(reader: R) -> Self {
		FileParser { reader }
	}
}

impl<R: Read + Seek> Parser for R {}

impl<R: Read + Seek> Read for FileParser<R> {
	fn read(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
		self.reader.read(buf)
	}
}

impl<R: Read + Seek> Seek for FileParser<R> {
	fn seek(&mut self, pos: SeekFrom) -> Result<u64, io::Error> {
		self.reader.seek(pos)
	}
}

#[cfg(test)]
mod tests {
	use std::io::Cursor;

	use super::*;

	#[test]
	fn with_offset_restores_position() {
		let mut cur = Cursor::new(vec![0u8; 64]);
		cur.set_offset(8).unwrap();
		let byte = cur.with_offset(32, |p| p.u8()).unwrap();
		assert_eq!(byte, Some(0));
		assert_eq!(cur.get_offset(), 8);
	}

	#[test]
	fn with_offset_zero_is_absent() {
		let mut cur = Cursor::new(vec![0u8; 4]);
		let res: Option<u8> = cur.with_offset(0, |p| p.u8()).unwrap();
		assert!(res.is_none());
	}

	#[test]
	fn align_rounds_up() {
		let mut cur = Cursor::new(vec![0u8; 16]);
		cur.set_offset(5).unwrap();
		cur.align(4).unwrap();
		assert_eq!(cur.get_offset(), 8);
		cur.align(4).unwrap();
		assert_eq!(cur.get_offset(), 8);
	}

	#[test]
	fn mutf8_basic_ascii() {
		let mut cur = Cursor::new(b"Hello".to_vec());
		assert_eq!(cur.parse_string(5).unwrap(), "Hello");
	}

	#[test]
	fn mutf8_two_byte_sequence() {
		// U+00E9 (e with acute) => 0xc3 0xa9
		let mut cur = Cursor::new(vec![0xc3, 0xa9]);
		assert_eq!(cur.parse_string(1).unwrap(), "\u{e9}");
	}

	#[test]
	fn mutf8_bare_zero_byte_is_rejected() {
		let mut cur = Cursor::new(vec![0x00]);
		assert!(cur.parse_string(1).is_err());
	}
}
