//! SIE 5 (XML): читаем подмножество, которое ложится на ту же модель.
//! <Sie><FileInfo>...</FileInfo><Accounts/><Dimensions/><Journal>...</Journal></Sie>
//!
//! Все данные в атрибутах. Битый XML — фатальная ошибка, кривое значение
//! атрибута — ошибка строки, элемент пропускается.

use crate::{
    error::{LineError, ParseError, Result, SieError},
    formats::sie::{BalanceKind, DocumentBuilder},
    model::{BookingYear, Document, ObjectRef, Voucher, VoucherRow},
    traits::ReadFormat,
};
use chrono::{Months, NaiveDate};
use quick_xml::{events::BytesStart, events::Event, Reader};
use rust_decimal::Decimal;
use std::io::BufRead;
use std::str::FromStr;

pub struct SieXml;

/// Элемент с уже раскодированными атрибутами.
struct Element {
    tag: &'static str,
    attrs: Vec<(String, String)>,
}

impl Element {
    fn parse(e: &BytesStart) -> Result<Option<Self>> {
        let Some(tag) = known_element(e.local_name().as_ref()) else {
            return Ok(None);
        };
        let mut attrs = Vec::new();
        for a in e.attributes() {
            let a = a.map_err(xml)?;
            let key = String::from_utf8_lossy(a.key.local_name().as_ref()).into_owned();
            let value = a.unescape_value().map_err(xml)?.into_owned();
            attrs.push((key, value));
        }
        Ok(Some(Self { tag, attrs }))
    }

    fn opt(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn req(&self, key: &'static str) -> std::result::Result<&str, LineError> {
        self.opt(key).ok_or(LineError::MissingField {
            tag: self.tag,
            field: key,
        })
    }

    fn date(&self, key: &'static str) -> std::result::Result<NaiveDate, LineError> {
        parse_iso_date(self.req(key)?)
    }

    fn opt_date(&self, key: &str) -> std::result::Result<Option<NaiveDate>, LineError> {
        self.opt(key).map(parse_iso_date).transpose()
    }

    fn decimal(&self, key: &'static str) -> std::result::Result<Decimal, LineError> {
        parse_amount(self.req(key)?)
    }

    fn opt_decimal(&self, key: &str) -> std::result::Result<Option<Decimal>, LineError> {
        self.opt(key).map(parse_amount).transpose()
    }
}

fn known_element(name: &[u8]) -> Option<&'static str> {
    const ELEMENTS: &[&str] = &[
        "SoftwareProduct",
        "FileCreation",
        "Company",
        "FiscalYear",
        "Account",
        "OpeningBalance",
        "ClosingBalance",
        "Dimension",
        "Object",
        "Journal",
        "JournalEntry",
        "LedgerEntry",
        "ObjectReference",
    ];
    ELEMENTS.iter().copied().find(|e| e.as_bytes() == name)
}

fn parse_iso_date(s: &str) -> std::result::Result<NaiveDate, LineError> {
    // FileCreation@time — полный timestamp, берём только дату
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| LineError::InvalidDate(s.to_string()))
}

fn parse_amount(s: &str) -> std::result::Result<Decimal, LineError> {
    Decimal::from_str(s.trim()).map_err(|_| LineError::InvalidNumber(s.to_string()))
}

/// `YYYY-MM` → первое число месяца.
fn month_start(s: &str) -> std::result::Result<NaiveDate, LineError> {
    if s.len() == 7 {
        NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
            .map_err(|_| LineError::InvalidDate(s.to_string()))
    } else {
        parse_iso_date(s)
    }
}

/// `YYYY-MM` → последнее число месяца.
fn month_end(s: &str) -> std::result::Result<NaiveDate, LineError> {
    if s.len() != 7 {
        return parse_iso_date(s);
    }
    month_start(s)?
        .checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| LineError::InvalidDate(s.to_string()))
}

fn xml<E: std::fmt::Display>(e: E) -> SieError {
    SieError::Xml(e.to_string())
}

struct FiscalYear {
    start: NaiveDate,
    end: NaiveDate,
    primary: bool,
}

#[derive(Default)]
struct XmlState {
    builder: DocumentBuilder<'static>,
    years: Vec<FiscalYear>,
    account: Option<String>,
    dimension: Option<String>,
    journal: String,
    voucher: Option<Voucher>,
    row: Option<VoucherRow>,
}

impl XmlState {
    fn open(&mut self, el: &Element) -> std::result::Result<(), LineError> {
        match el.tag {
            "SoftwareProduct" => {
                let name = el.req("name")?.to_string();
                self.builder
                    .set_program(name, el.opt("version").map(str::to_string));
            }
            "FileCreation" => {
                let date = el.date("time")?;
                self.builder.set_generated(date);
            }
            "Company" => self.builder.set_company(
                el.opt("name").map(str::to_string),
                el.opt("organizationId").map(str::to_string),
            ),
            "FiscalYear" => {
                let start = month_start(el.req("start")?)?;
                let end = month_end(el.req("end")?)?;
                let primary = el.opt("primary") == Some("true");
                self.years.push(FiscalYear {
                    start,
                    end,
                    primary,
                });
            }
            "Account" => {
                let id = el.req("id")?.to_string();
                let name = el.opt("name").unwrap_or_default().to_string();
                self.builder.insert_account(id.clone(), name);
                if let Some(kind) = el.opt("type") {
                    self.builder
                        .with_account(&id, |a| a.account_type = Some(kind.to_string()));
                }
                self.account = Some(id);
            }
            "OpeningBalance" | "ClosingBalance" => {
                let amount = el.decimal("amount")?;
                let kind = if el.tag == "OpeningBalance" {
                    BalanceKind::Opening
                } else {
                    BalanceKind::Closing
                };
                if let Some(account) = &self.account {
                    self.builder.set_balance(kind, 0, account, amount);
                }
            }
            "Dimension" => {
                let id = el.req("id")?.to_string();
                let name = el.opt("name").unwrap_or_default().to_string();
                self.builder.insert_dimension(id.clone(), name);
                self.dimension = Some(id);
            }
            "Object" => {
                let id = el.req("id")?.to_string();
                let name = el.opt("name").unwrap_or_default().to_string();
                if let Some(dim) = self.dimension.clone() {
                    self.builder.insert_object(dim, id, name);
                }
            }
            "Journal" => self.journal = el.opt("id").unwrap_or_default().to_string(),
            "JournalEntry" => {
                let number = el.req("id")?.to_string();
                let date = el.date("journalDate")?;
                let mut voucher = Voucher::new(self.journal.clone(), number, date);
                voucher.text = el.opt("text").unwrap_or_default().to_string();
                self.voucher = Some(voucher);
            }
            "LedgerEntry" => {
                let Some(voucher) = &self.voucher else {
                    return Ok(());
                };
                self.row = Some(VoucherRow {
                    account: el.req("accountId")?.to_string(),
                    objects: Vec::new(),
                    amount: el.decimal("amount")?,
                    transaction_date: el.opt_date("ledgerDate")?.unwrap_or(voucher.date),
                    text: el.opt("text").unwrap_or_default().to_string(),
                    quantity: el.opt_decimal("quantity")?,
                    registration_sign: None,
                });
            }
            "ObjectReference" => {
                let object = ObjectRef::new(el.req("dimId")?, el.req("objectId")?);
                if let Some(row) = &mut self.row {
                    row.objects.push(object);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, tag: &[u8]) {
        match tag {
            b"Account" => self.account = None,
            b"Dimension" => self.dimension = None,
            b"Journal" => self.journal.clear(),
            b"LedgerEntry" => {
                if let (Some(row), Some(voucher)) = (self.row.take(), &mut self.voucher) {
                    voucher.rows.push(row);
                }
            }
            b"JournalEntry" => {
                if let Some(voucher) = self.voucher.take() {
                    self.builder.push_voucher(voucher);
                }
            }
            _ => {}
        }
    }

    fn report(&mut self, line: usize, tag: &str, kind: LineError) {
        self.builder.report(ParseError::new(line, tag, kind));
    }

    /// Основной год получает индекс 0, более ранние — -1, -2, ...
    fn finish(mut self) -> Document {
        self.years.sort_by_key(|y| y.start);
        let primary = self
            .years
            .iter()
            .position(|y| y.primary)
            .unwrap_or(self.years.len().saturating_sub(1));
        for (i, y) in self.years.iter().enumerate() {
            self.builder.push_booking_year(BookingYear {
                id: i as i32 - primary as i32,
                start: y.start,
                end: y.end,
            });
        }
        self.builder.finish()
    }
}

fn line_at(bytes: &[u8], pos: usize) -> usize {
    bytes[..pos.min(bytes.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

impl ReadFormat for SieXml {
    fn read<R: BufRead>(mut r: R) -> Result<Document> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);

        let mut reader = Reader::from_reader(body);
        reader.trim_text(true);

        let mut state = XmlState::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    if let Some(el) = Element::parse(&e)? {
                        if let Err(kind) = state.open(&el) {
                            let line = line_at(body, reader.buffer_position());
                            state.report(line, el.tag, kind);
                        }
                    }
                }
                Ok(Event::Empty(e)) => {
                    if let Some(el) = Element::parse(&e)? {
                        match state.open(&el) {
                            Ok(()) => state.close(el.tag.as_bytes()),
                            Err(kind) => {
                                let line = line_at(body, reader.buffer_position());
                                state.report(line, el.tag, kind);
                            }
                        }
                    }
                }
                Ok(Event::End(e)) => state.close(e.local_name().as_ref()),
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml(e)),
                _ => {}
            }
            buf.clear();
        }
        Ok(state.finish())
    }
}
