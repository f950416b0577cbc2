use std::{
	convert::TryInto,
	io::{ErrorKind, Read},
	num::TryFromIntError,
	ops::Deref,
};

use byteorder::{LittleEndian, ReadBytesExt};
use eyre::Result;

use crate::dex::parser::{ParseError, Parser};

pub trait Parse
where
	Self: Sized,
{
	fn parse<P: Parser>(parser: &mut P) -> eyre::Result<Self>;
}

macro_rules! parse_simple {
	($($ty:tt),*) => {
		$(
			impl Parse for $ty {
				fn parse<P: Parser>(parser: &mut P) -> eyre::Result<Self> {
					parser.$ty()
				}
			}
		)*
	};
}

parse_simple!(u8, u16, i16, u32, i32);

macro_rules! parse_struct_default {
	($name:ident $align:literal { $($field:ident),* }) => {
		impl Parse for $name {
			fn parse<P: Parser>(parser: &mut P) -> eyre::Result<Self> {
				if $align != 0 {
					parser.align($align)?;
				}
				Ok($name {
					$($field: parser.parse()?),*
				})
			}
		}
	};
	($name:ident $align:literal { $($field:ident),*, }) => {
		parse_struct_default!($name $align { $($field),* });
	};
	($name:ident { $($field:ident),* }) => {
		parse_struct_default!($name 0 { $($field),* });
	};
	($name:ident { $($field:ident),*, }) => {
		parse_struct_default!($name 0 { $($field),* });
	};
}

/// Longest legal encoding of a 32-bit varint per the DEX format.
const ULEB32_MAX_BYTES: u64 = 5;

#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub struct Uleb128(u32);

impl Parse for Uleb128 {
	fn parse<P: Parser>(parser: &mut P) -> Result<Self> {
		parser.uleb128()
	}
}

impl Deref for Uleb128 {
	type Target = u32;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl From<Uleb128> for u32 {
	fn from(v: Uleb128) -> u32 {
		v.0
	}
}

impl TryInto<usize> for Uleb128 {
	type Error = TryFromIntError;

	fn try_into(self) -> core::result::Result<usize, Self::Error> {
		self.0.try_into()
	}
}

#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub struct Sleb128(i32);

impl Parse for Sleb128 {
	fn parse<P: Parser>(parser: &mut P) -> Result<Self> {
		parser.sleb128()
	}
}

impl Deref for Sleb128 {
	type Target = i32;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl From<Sleb128> for i32 {
	fn from(v: Sleb128) -> i32 {
		v.0
	}
}

fn eof_as_truncated(err: std::io::Error) -> ParseError {
	if err.kind() == ErrorKind::UnexpectedEof {
		ParseError::TruncatedInput
	} else {
		ParseError::Io(err)
	}
}

fn leb_error(err: leb128::read::Error, remaining: u64) -> ParseError {
	match err {
		leb128::read::Error::Overflow => ParseError::MalformedLeb,
		leb128::read::Error::IoError(io) => {
			// EOF with the byte cap used up means the varint kept
			// going past its maximum legal length.
			if io.kind() == ErrorKind::UnexpectedEof && remaining == 0 {
				ParseError::MalformedLeb
			} else {
				eof_as_truncated(io)
			}
		}
	}
}

pub trait ReadThings: ReadBytesExt {
	#[cfg_attr(feature = "trace", instrument(skip(self)))]
	fn u8(&mut self) -> Result<u8> {
		Ok(self.read_u8().map_err(eof_as_truncated)?)
	}

	/// Reads one byte and splits it into (low nibble, high nibble),
	/// the `B|A` operand packing of the 4-bit register formats.
	#[cfg_attr(feature = "trace", instrument(skip(self)))]
	fn split_u8(&mut self) -> Result<(u8, u8)> {
		let val = self.u8()?;
		Ok((val & 0xf, val >> 4))
	}

	#[cfg_attr(feature = "trace", instrument(skip(self)))]
	fn u16(&mut self) -> Result<u16> {
		Ok(self.read_u16::<LittleEndian>().map_err(eof_as_truncated)?)
	}

	#[cfg_attr(feature = "trace", instrument(skip(self)))]
	fn i16(&mut self) -> Result<i16> {
		Ok(self.read_i16::<LittleEndian>().map_err(eof_as_truncated)?)
	}

	#[cfg_attr(feature = "trace", instrument(skip(self)))]
	fn u32(&mut self) -> Result<u32> {
		Ok(self.read_u32::<LittleEndian>().map_err(eof_as_truncated)?)
	}

	#[cfg_attr(feature = "trace", instrument(skip(self)))]
	fn i32(&mut self) -> Result<i32> {
		Ok(self.read_i32::<LittleEndian>().map_err(eof_as_truncated)?)
	}

	#[cfg_attr(feature = "trace", instrument(skip(self)))]
	fn u64(&mut self) -> Result<u64> {
		Ok(self.read_u64::<LittleEndian>().map_err(eof_as_truncated)?)
	}

	#[cfg_attr(feature = "trace", instrument(skip(self)))]
	fn i64(&mut self) -> Result<i64> {
		Ok(self.read_i64::<LittleEndian>().map_err(eof_as_truncated)?)
	}

	#[cfg_attr(feature = "trace", instrument(skip(self)))]
	fn uleb128(&mut self) -> Result<Uleb128>
	where
		Self: Sized,
	{
		let mut capped = self.by_ref().take(ULEB32_MAX_BYTES);
		let val = match leb128::read::unsigned(&mut capped) {
			Ok(val) => val,
			Err(err) => return Err(leb_error(err, capped.limit()).into()),
		};
		let val = val.try_into().map_err(|_| ParseError::MalformedLeb)?;
		Ok(Uleb128(val))
	}

	#[cfg_attr(feature = "trace", instrument(skip(self)))]
	fn sleb128(&mut self) -> Result<Sleb128>
	where
		Self: Sized,
	{
		let mut capped = self.by_ref().take(ULEB32_MAX_BYTES);
		let val = match leb128::read::signed(&mut capped) {
			Ok(val) => val,
			Err(err) => return Err(leb_error(err, capped.limit()).into()),
		};
		// The 5th byte of a 32-bit sleb128 sign-extends past bit 31, so
		// only values outside the signed 32-bit range are malformed.
		if val < i64::from(i32::min_value()) || val > i64::from(i32::max_value()) {
			return Err(ParseError::MalformedLeb.into());
		}
		Ok(Sleb128(val as i32))
	}
}

impl<T: ReadBytesExt> ReadThings for T {}

#[cfg(test)]
mod tests {
	use std::io::Cursor;

	use super::*;
	use crate::dex::parser::ParseError;

	fn kind_of(err: eyre::Report) -> ParseError {
		err.downcast::<ParseError>().expect("a ParseError kind")
	}

	#[test]
	fn primitives_are_little_endian() {
		let mut cur = Cursor::new(vec![0x78, 0x56, 0x34, 0x12]);
		assert_eq!(cur.u32().unwrap(), 0x1234_5678);
	}

	#[test]
	fn split_u8_gives_low_then_high_nibble() {
		let mut cur = Cursor::new(vec![0xb3]);
		assert_eq!(cur.split_u8().unwrap(), (0x3, 0xb));
	}

	#[test]
	fn truncated_u32_reports_truncated_input() {
		let mut cur = Cursor::new(vec![0x01, 0x02]);
		match kind_of(cur.u32().unwrap_err()) {
			ParseError::TruncatedInput => {}
			other => panic!("expected TruncatedInput, got {:?}", other),
		}
	}

	#[test]
	fn uleb128_multi_byte() {
		let mut cur = Cursor::new(vec![0x80, 0x7f]);
		assert_eq!(*cur.uleb128().unwrap(), 0x3f80);
	}

	#[test]
	fn uleb128_max_u32_fits_in_five_bytes() {
		let mut cur = Cursor::new(vec![0xff, 0xff, 0xff, 0xff, 0x0f]);
		assert_eq!(*cur.uleb128().unwrap(), u32::max_value());
	}

	#[test]
	fn uleb128_six_bytes_is_malformed() {
		let mut cur = Cursor::new(vec![0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
		match kind_of(cur.uleb128().unwrap_err()) {
			ParseError::MalformedLeb => {}
			other => panic!("expected MalformedLeb, got {:?}", other),
		}
	}

	#[test]
	fn sleb128_negative() {
		let mut cur = Cursor::new(vec![0x80, 0x7f]);
		assert_eq!(*cur.sleb128().unwrap(), -128);
	}
}
