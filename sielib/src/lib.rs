//! sielib — чтение и запись файлов SIE (шведский формат обмена бухгалтерией):
//! теговый текст SIE 4, XML SIE 5, выгрузка журнала в CSV.

pub mod compare;
pub mod encoding;
pub mod error;
pub mod model;
pub mod traits;

pub mod formats {
    pub mod csv;
    pub mod sie;
    pub mod xml;
}

pub use compare::compare;

use crate::{error::Result, formats::xml::SieXml, model::Document, traits::ReadFormat};
use std::io::BufRead;

/// Читает документ любого диалекта: XML по декларации `<?xml`, иначе SIE 4.
/// Расширение файла роли не играет.
pub fn read_document<R: BufRead>(mut r: R) -> Result<Document> {
    let mut bytes = Vec::new();
    r.read_to_end(&mut bytes)?;
    if encoding::looks_like_xml(&bytes) {
        log::debug!("XML declaration found, reading as SIE 5");
        SieXml::read(bytes.as_slice())
    } else {
        Ok(formats::sie::parse_str(&encoding::decode(bytes)?))
    }
}
