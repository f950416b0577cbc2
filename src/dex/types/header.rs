use color_eyre::{eyre::bail, Result};
use tracing::debug;

use crate::dex::parser::{Parse, ParseError, Parser};

const MAGIC_PREFIX: &[u8; 4] = b"dex\n";

/// All multi-byte values in a DEX image are little-endian; a
/// byte-swapped image announces itself with the reversed tag and is
/// not something this reader decodes.
const LITTLE_ENDIAN_TAG: u32 = 0x1234_5678;
const BIG_ENDIAN_TAG: u32 = 0x7856_3412;

/// Location of one id section in the image: entry count plus absolute
/// byte offset. A count of 0 comes with an offset of 0.
#[derive(Debug, Copy, Clone, Default)]
pub struct Section {
	pub size:   u32,
	pub offset: u32,
}

impl Parse for Section {
	fn parse<P: Parser>(parser: &mut P) -> Result<Self> {
		Ok(Section {
			size:   parser.u32()?,
			offset: parser.u32()?,
		})
	}
}

/// The DEX header: identity, integrity fields, and the (count, offset)
/// pair of every pool section. The pools are decoded from these pairs;
/// the map list is redundant with them and ignored.
///
/// https://source.android.com/devices/tech/dalvik/dex-format#header-item
#[derive(Debug, Copy, Clone)]
pub struct Header {
	pub version:     u32,
	pub checksum:    u32,
	pub signature:   [u8; 20],
	pub file_size:   u32,
	pub header_size: u32,
	pub link:        Section,
	pub map_off:     u32,
	pub string_ids:  Section,
	pub type_ids:    Section,
	pub proto_ids:   Section,
	pub field_ids:   Section,
	pub method_ids:  Section,
	pub class_defs:  Section,
	pub data:        Section,
}

/// Magic is `dex\n0NN\0`; the three version bytes are ASCII digits.
fn parse_version<P: Parser>(parser: &mut P) -> Result<u32> {
	let mut magic = [0u8; 8];
	for byte in magic.iter_mut() {
		*byte = parser.u8()?;
	}

	if &magic[..4] != MAGIC_PREFIX || magic[7] != 0 {
		bail!(ParseError::generic(format!(
			"not a DEX image (magic {:02x?})",
			&magic[..4]
		)));
	}

	magic[4..7]
		.iter()
		.try_fold(0u32, |version, &byte| match byte {
			b'0'..=b'9' => Some(version * 10 + u32::from(byte - b'0')),
			_ => None,
		})
		.ok_or_else(|| ParseError::generic("malformed version digits in DEX magic").into())
}

impl Parse for Header {
	#[cfg_attr(feature = "trace", instrument(skip(parser)))]
	fn parse<P: Parser>(parser: &mut P) -> Result<Self> {
		let version = parse_version(parser)?;
		let checksum = parser.u32()?;

		let mut signature = [0u8; 20];
		for byte in signature.iter_mut() {
			*byte = parser.u8()?;
		}

		let file_size = parser.u32()?;
		let header_size = parser.u32()?;

		match parser.u32()? {
			LITTLE_ENDIAN_TAG => {}
			BIG_ENDIAN_TAG => {
				bail!(ParseError::generic("byte-swapped DEX images are not supported"))
			}
			other => bail!(ParseError::generic(format!("bad endian tag {:#010x}", other))),
		}

		let link = parser.parse()?;
		let map_off = parser.u32()?;
		let string_ids: Section = parser.parse()?;
		let type_ids: Section = parser.parse()?;
		let proto_ids = parser.parse()?;
		let field_ids = parser.parse()?;
		let method_ids = parser.parse()?;
		let class_defs = parser.parse()?;
		let data = parser.parse()?;

		debug!(
			version,
			strings = string_ids.size,
			types = type_ids.size,
			"parsed dex header"
		);

		Ok(Header {
			version,
			checksum,
			signature,
			file_size,
			header_size,
			link,
			map_off,
			string_ids,
			type_ids,
			proto_ids,
			field_ids,
			method_ids,
			class_defs,
			data,
		})
	}
}
