mod adapt;
mod cache;
mod codec;
mod decrypt;
mod error;
mod header;
mod io;
mod keyword_index;
mod keyword_table;
mod lookup;
mod murmur;
mod record_index;
mod scanner;

pub use crate::adapt::KeyMaker;
pub use crate::error::{Error, Result};
pub use crate::header::Attributes;
pub use crate::io::{ByteSource, FileSource};
pub use crate::lookup::{Dictionary, DictionaryBuilder};
