//! Декодирование одной строки в типизированную запись.
//!
//! Здесь только проверка количества полей и преобразование типов;
//! документ не трогается. Ошибка — `LineError`, её подхватывает диспетчер.

use super::tokenizer::{decode_objects, repair_fields};
use crate::{
    error::LineError,
    model::{BookingYear, ObjectRef},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceKind {
    Opening,
    Closing,
    Result,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoucherHeader {
    pub series: String,
    pub number: String,
    pub date: NaiveDate,
    pub text: String,
    pub registration_date: Option<NaiveDate>,
    pub registration_sign: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowRecord {
    pub account: String,
    pub objects: Vec<ObjectRef>,
    pub amount: Decimal,
    /// None — взять дату верификации.
    pub transaction_date: Option<NaiveDate>,
    pub text: String,
    pub quantity: Option<Decimal>,
    pub registration_sign: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    CompanyName(String),
    RegistrationNumber(String),
    Format(String),
    Generated(NaiveDate),
    Program {
        name: String,
        version: Option<String>,
    },
    SieType(String),
    Dimension {
        number: String,
        name: String,
    },
    Object {
        dimension: String,
        number: String,
        name: String,
    },
    BookingYear(BookingYear),
    Account {
        number: String,
        name: String,
    },
    AccountType {
        account: String,
        kind: String,
    },
    Unit {
        account: String,
        unit: String,
    },
    Sru {
        account: String,
        code: String,
    },
    Balance {
        kind: BalanceKind,
        year: i32,
        account: String,
        amount: Decimal,
    },
    ObjectBalance {
        kind: BalanceKind,
        year: i32,
        account: String,
        object: Option<ObjectRef>,
        amount: Decimal,
    },
    PeriodValue {
        year: i32,
        period: String,
        account: String,
        objects: Vec<ObjectRef>,
        amount: Decimal,
        quantity: Option<Decimal>,
    },
    VoucherHeader(VoucherHeader),
    VoucherRow(RowRecord),
    /// Известный тег, который модель не хранит.
    Ignored,
}

/// Теги, которые принимаются молча.
const IGNORED: &[&str] = &[
    "#FLAGGA",
    "#ADRESS",
    "#BKOD",
    "#BTRANS",
    "#RTRANS",
    "#ENDRAR",
    "#FNR",
    "#FORDER",
    "#FTYP",
    "#KPTYP",
    "#KRSTYPKOD",
    "#KUNDLEVFODRINGAR",
    // нестандартный тег старых экспортов, модель его не хранит
    "#OB",
    "#OMFATTN",
    "#PBUDGET",
    "#PERIOD",
    "#PROSA",
    "#TAXAR",
    "#UNDERDIM",
    "#VALUTA",
];

/// Разбирает поля строки по тегу `tag` (уже в верхнем регистре).
/// `raw` — исходная строка целиком, нужна для починки полей.
pub fn decode(tag: &str, fields: &[String], raw: &str) -> Result<Record, LineError> {
    let f = Fields {
        tag: known_tag(tag),
        fields,
    };
    let record = match tag {
        "#FNAMN" => Record::CompanyName(f.req(1, "name")?.to_string()),
        "#ORGNR" => Record::RegistrationNumber(f.req(1, "number")?.to_string()),
        "#FORMAT" => Record::Format(f.req(1, "format")?.to_string()),
        "#GEN" => Record::Generated(parse_date(f.req(1, "date")?)?),
        "#PROGRAM" => Record::Program {
            name: f.req(1, "name")?.to_string(),
            version: f.opt(2).map(str::to_string),
        },
        "#SIETYP" => Record::SieType(f.req(1, "type")?.to_string()),
        "#DIM" => Record::Dimension {
            number: f.req(1, "dimension")?.to_string(),
            name: f.req(2, "name")?.to_string(),
        },
        "#OBJEKT" | "#OBJECT" => Record::Object {
            dimension: f.req(1, "dimension")?.to_string(),
            number: f.req(2, "object")?.to_string(),
            name: f.req(3, "name")?.to_string(),
        },
        "#RAR" => Record::BookingYear(BookingYear {
            id: parse_int(f.req(1, "year")?)?,
            start: parse_date(f.req(2, "start")?)?,
            end: parse_date(f.req(3, "end")?)?,
        }),
        "#KONTO" => Record::Account {
            number: f.req(1, "account")?.to_string(),
            name: f.req(2, "name")?.to_string(),
        },
        "#KTYP" => Record::AccountType {
            account: f.req(1, "account")?.to_string(),
            kind: f.req(2, "type")?.to_string(),
        },
        "#ENHET" => Record::Unit {
            account: f.req(1, "account")?.to_string(),
            unit: f.req(2, "unit")?.to_string(),
        },
        "#SRU" => Record::Sru {
            account: f.req(1, "account")?.to_string(),
            code: f.req(2, "code")?.to_string(),
        },
        "#IB" | "#UB" | "#RES" => Record::Balance {
            kind: balance_kind(tag),
            year: parse_int(f.req(1, "year")?)?,
            account: f.req(2, "account")?.to_string(),
            amount: parse_decimal(f.req(3, "amount")?)?,
        },
        "#OIB" | "#OUB" => decode_object_balance(f.tag, fields, raw)?,
        "#PSALDO" => decode_period_value(fields, raw)?,
        "#VER" => Record::VoucherHeader(VoucherHeader {
            series: f.req(1, "series")?.to_string(),
            number: f.req(2, "number")?.to_string(),
            date: parse_date(f.req(3, "date")?)?,
            text: f.opt(4).unwrap_or_default().to_string(),
            registration_date: f.opt(5).map(parse_opt_date).transpose()?.flatten(),
            registration_sign: f.opt(6).filter(|s| !s.is_empty()).map(str::to_string),
        }),
        "#TRANS" => Record::VoucherRow(decode_row(fields, raw)?),
        t if IGNORED.contains(&t) => Record::Ignored,
        t => return Err(LineError::UnknownCommand(t.to_string())),
    };
    Ok(record)
}

fn balance_kind(tag: &str) -> BalanceKind {
    match tag {
        "#IB" | "#OIB" => BalanceKind::Opening,
        "#UB" | "#OUB" => BalanceKind::Closing,
        _ => BalanceKind::Result,
    }
}

/// `#OIB год счёт {объекты} сумма [кол-во]`
fn decode_object_balance(
    tag: &'static str,
    fields: &[String],
    raw: &str,
) -> Result<Record, LineError> {
    let fields = with_repair(fields, 5, raw);
    let f = Fields {
        tag,
        fields: &fields,
    };
    Ok(Record::ObjectBalance {
        kind: balance_kind(tag),
        year: parse_int(f.req(1, "year")?)?,
        account: f.req(2, "account")?.to_string(),
        object: decode_objects(f.req(3, "objects")?).into_iter().next(),
        amount: parse_decimal(f.req(4, "amount")?)?,
    })
}

/// `#PSALDO год период счёт {объекты} сумма [кол-во]`
fn decode_period_value(fields: &[String], raw: &str) -> Result<Record, LineError> {
    let fields = with_repair(fields, 6, raw);
    let f = Fields {
        tag: "#PSALDO",
        fields: &fields,
    };
    Ok(Record::PeriodValue {
        year: parse_int(f.req(1, "year")?)?,
        period: f.req(2, "period")?.to_string(),
        account: f.req(3, "account")?.to_string(),
        objects: decode_objects(f.req(4, "objects")?),
        amount: parse_decimal(f.req(5, "amount")?)?,
        quantity: f.opt(6).map(parse_opt_decimal).transpose()?.flatten(),
    })
}

/// `#TRANS счёт {объекты} сумма [дата [текст [кол-во [подпись]]]]`
fn decode_row(fields: &[String], raw: &str) -> Result<RowRecord, LineError> {
    let fields = with_repair(fields, 4, raw);
    let f = Fields {
        tag: "#TRANS",
        fields: &fields,
    };
    Ok(RowRecord {
        account: f.req(1, "account")?.to_string(),
        objects: decode_objects(f.req(2, "objects")?),
        amount: parse_decimal(f.req(3, "amount")?)?,
        // кривая или пустая дата — не ошибка, подставится дата верификации
        transaction_date: f.opt(4).and_then(|s| parse_date(s).ok()),
        text: f.opt(5).unwrap_or_default().to_string(),
        quantity: f.opt(6).map(parse_opt_decimal).transpose()?.flatten(),
        registration_sign: f.opt(7).filter(|s| !s.is_empty()).map(str::to_string),
    })
}

/// Если полей меньше `min`, перечитываем хвост строки после тега.
fn with_repair(fields: &[String], min: usize, raw: &str) -> Vec<String> {
    if fields.len() >= min {
        return fields.to_vec();
    }
    let rest = raw
        .trim_start()
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest)
        .unwrap_or("");
    let mut repaired = vec![fields.first().cloned().unwrap_or_default()];
    repaired.extend(repair_fields(rest));
    if repaired.len() > fields.len() {
        log::trace!("repaired short line: {raw}");
        repaired
    } else {
        fields.to_vec()
    }
}

struct Fields<'a> {
    tag: &'static str,
    fields: &'a [String],
}

impl<'a> Fields<'a> {
    fn req(&self, idx: usize, field: &'static str) -> Result<&'a str, LineError> {
        self.fields
            .get(idx)
            .map(String::as_str)
            .ok_or(LineError::MissingField {
                tag: self.tag,
                field,
            })
    }

    fn opt(&self, idx: usize) -> Option<&'a str> {
        self.fields.get(idx).map(String::as_str)
    }
}

/// `MissingField` хранит `&'static str`, поэтому тег берётся из таблицы.
fn known_tag(tag: &str) -> &'static str {
    const TAGS: &[&str] = &[
        "#FNAMN", "#ORGNR", "#FORMAT", "#GEN", "#PROGRAM", "#SIETYP", "#DIM", "#OBJEKT",
        "#OBJECT", "#RAR", "#KONTO", "#KTYP", "#ENHET", "#SRU", "#IB", "#UB", "#RES", "#OIB",
        "#OUB", "#PSALDO", "#VER", "#TRANS",
    ];
    TAGS.iter().copied().find(|t| *t == tag).unwrap_or("#?")
}

/// Дата SIE — ровно 8 цифр `YYYYMMDD`.
pub fn parse_date(s: &str) -> Result<NaiveDate, LineError> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LineError::InvalidDate(s.to_string()));
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|_| LineError::InvalidDate(s.to_string()))
}

fn parse_opt_date(s: &str) -> Result<Option<NaiveDate>, LineError> {
    if s.is_empty() {
        Ok(None)
    } else {
        parse_date(s).map(Some)
    }
}

fn parse_int(s: &str) -> Result<i32, LineError> {
    s.parse().map_err(|_| LineError::InvalidNumber(s.to_string()))
}

pub fn parse_decimal(s: &str) -> Result<Decimal, LineError> {
    Decimal::from_str(s).map_err(|_| LineError::InvalidNumber(s.to_string()))
}

fn parse_opt_decimal(s: &str) -> Result<Option<Decimal>, LineError> {
    if s.is_empty() {
        Ok(None)
    } else {
        parse_decimal(s).map(Some)
    }
}
