//! Доменные модели SIE-документа — общий слой для тегового текста и XML.

use crate::error::ParseError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub program_name: Option<String>,
    pub program_version: Option<String>,
    pub format: Option<String>,
    pub generated: Option<NaiveDate>,
    pub sie_type: Option<String>,
    pub company_name: Option<String>,
    pub registration_number: Option<String>,

    /// Ключ — номер счёта; BTreeMap сразу даёт порядок по возрастанию номера.
    pub accounts: BTreeMap<String, Account>,
    pub dimensions: Vec<Dimension>,
    pub booking_years: Vec<BookingYear>,
    pub vouchers: Vec<Voucher>,

    /// Ошибки отдельных строк. Документ возвращается даже при непустом списке.
    #[serde(skip)]
    pub errors: Vec<ParseError>,
}

impl Document {
    pub fn account(&self, number: &str) -> Option<&Account> {
        self.accounts.get(number)
    }

    pub fn dimension(&self, number: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.number == number)
    }

    /// Ленивое разрешение ссылки из строки проводки.
    pub fn object(&self, r: &ObjectRef) -> Option<&SieObject> {
        self.dimension(&r.dimension)?.objects.get(&r.object)
    }

    /// Линейный поиск: при повторяющихся id побеждает первый объявленный год.
    pub fn booking_year(&self, id: i32) -> Option<&BookingYear> {
        self.booking_years.iter().find(|y| y.id == id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub number: String,
    pub name: String,
    pub account_type: Option<String>,
    pub unit: Option<String>,
    pub sru_code: Option<String>,
    pub opening_balance: Decimal,
    pub closing_balance: Decimal,
    pub result: Decimal,
    pub period_values: Vec<PeriodValue>,
}

impl Account {
    pub fn new(number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Dimension {
    pub number: String,
    pub name: String,
    pub objects: BTreeMap<String, SieObject>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SieObject {
    /// Номер измерения — только для поиска, не владение.
    pub dimension: String,
    pub number: String,
    pub name: String,
    pub opening_balance: Decimal,
    pub closing_balance: Decimal,
}

/// Пара (измерение, объект) из списка `{1 "100" 2 "200"}`.
/// Объект может быть нигде не объявлен — это допустимо.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub dimension: String,
    pub object: String,
}

impl ObjectRef {
    pub fn new(dimension: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            object: object.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingYear {
    /// 0 — текущий год, отрицательные — предыдущие.
    pub id: i32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeriodValue {
    /// Индекс года как в файле; пишется обратно без изменений.
    pub year: i32,
    /// Заполняется, только если индекс года нашёлся среди `#RAR`.
    pub booking_year: Option<i32>,
    pub period: String,
    pub objects: Vec<ObjectRef>,
    pub value: Decimal,
    pub quantity: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Voucher {
    pub series: String,
    pub number: String,
    pub date: NaiveDate,
    pub text: String,
    pub registration_date: Option<NaiveDate>,
    pub registration_sign: Option<String>,
    pub rows: Vec<VoucherRow>,
}

impl Voucher {
    pub fn new(series: impl Into<String>, number: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            series: series.into(),
            number: number.into(),
            date,
            text: String::new(),
            registration_date: None,
            registration_sign: None,
            rows: Vec::new(),
        }
    }

    /// Сумма проводок; у сбалансированной верификации — ноль.
    pub fn balance(&self) -> Decimal {
        self.rows.iter().map(|r| r.amount).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoucherRow {
    pub account: String,
    pub objects: Vec<ObjectRef>,
    pub amount: Decimal,
    pub transaction_date: NaiveDate,
    pub text: String,
    pub quantity: Option<Decimal>,
    pub registration_sign: Option<String>,
}
