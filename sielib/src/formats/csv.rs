//! Выгрузка журнала в CSV: одна запись на строку верификации.
//! Заголовки:
//! series,number,date,voucher_text,account,objects,amount,transaction_date,row_text,quantity

use crate::{error::Result, formats::sie::format_objects, model::Document};
use csv::WriterBuilder;
use std::io::Write;

#[derive(serde::Serialize)]
struct CsvOutRow<'a> {
    series: &'a str,
    number: &'a str,
    date: String,
    voucher_text: &'a str,
    account: &'a str,
    objects: String,
    amount: String,
    transaction_date: String,
    row_text: &'a str,
    quantity: Option<String>,
}

/// Только запись: обратно из CSV документ не собрать.
pub struct CsvJournal;

impl crate::traits::WriteFormat for CsvJournal {
    fn write<W: Write>(mut w: W, doc: &Document) -> Result<()> {
        let mut wrt = WriterBuilder::new().from_writer(&mut w);

        for v in &doc.vouchers {
            for row in &v.rows {
                let out = CsvOutRow {
                    series: &v.series,
                    number: &v.number,
                    date: v.date.format("%Y-%m-%d").to_string(),
                    voucher_text: &v.text,
                    account: &row.account,
                    objects: format_objects(&row.objects),
                    amount: row.amount.to_string(),
                    transaction_date: row.transaction_date.format("%Y-%m-%d").to_string(),
                    row_text: &row.text,
                    quantity: row.quantity.map(|q| q.to_string()),
                };
                wrt.serialize(out)?;
            }
        }
        wrt.flush()?;
        Ok(())
    }
}
