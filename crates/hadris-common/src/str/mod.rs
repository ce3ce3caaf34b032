pub mod utf16;

pub use utf16::FixedUtf16Str;
