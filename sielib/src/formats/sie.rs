//! SIE 4: строчный формат с тегами `#KONTO`, `#VER`, `#TRANS` и т.д.

mod builder;
mod record;
pub mod tokenizer;
mod writer;

pub use builder::{DocumentBuilder, VoucherFilter};
pub use record::BalanceKind;
pub use writer::{format_objects, WriteOptions};

use crate::{
    encoding::{self, Encoding},
    error::Result,
    model::{Document, Voucher},
    traits::{ReadFormat, WriteFormat},
};
use std::io::{BufRead, Write};

pub struct Sie;

/// Разбор уже декодированного текста. Не падает: ошибки строк — в `doc.errors`.
pub fn parse_str(text: &str) -> Document {
    feed_all(DocumentBuilder::new(), text)
}

/// То же, но каждая законченная верификация сначала отдаётся `keep`;
/// в документ попадают только те, для которых он вернул `true`.
pub fn parse_str_with(text: &str, keep: impl FnMut(&Voucher) -> bool) -> Document {
    feed_all(DocumentBuilder::new().with_voucher_filter(keep), text)
}

fn feed_all(mut builder: DocumentBuilder<'_>, text: &str) -> Document {
    for (idx, line) in text.lines().enumerate() {
        builder.feed(idx + 1, line);
    }
    builder.finish()
}

pub fn to_string(doc: &Document, opts: &WriteOptions) -> String {
    writer::render(doc, opts, Encoding::Pc8)
}

impl Sie {
    pub fn write_with<W: Write>(
        mut w: W,
        doc: &Document,
        opts: &WriteOptions,
        enc: Encoding,
    ) -> Result<()> {
        let bytes = encoding::encode(writer::render(doc, opts, enc), enc)?;
        w.write_all(&bytes)?;
        Ok(())
    }
}

impl ReadFormat for Sie {
    fn read<R: BufRead>(mut r: R) -> Result<Document> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        Ok(parse_str(&encoding::decode(bytes)?))
    }
}

impl WriteFormat for Sie {
    fn write<W: Write>(w: W, doc: &Document) -> Result<()> {
        Sie::write_with(w, doc, &WriteOptions::default(), Encoding::Pc8)
    }
}
