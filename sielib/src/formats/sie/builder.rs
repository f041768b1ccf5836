//! Диспетчер строк и сборщик документа.
//!
//! Один проход по строкам. Вне блока верификации каждая строка декодируется
//! в `Record` и применяется к документу. После `#VER` читаем блок `{ ... }`:
//! `#TRANS` становятся проводками, всё прочее внутри блока игнорируется.

use super::record::{self, BalanceKind, Record, RowRecord, VoucherHeader};
use super::tokenizer::tokenize;
use crate::{
    error::{LineError, ParseError},
    model::{
        Account, BookingYear, Dimension, Document, ObjectRef, PeriodValue, SieObject, Voucher,
        VoucherRow,
    },
};
use chrono::NaiveDate;
use rust_decimal::Decimal;

enum State {
    Idle,
    /// `voucher == None` — заголовок не разобрался, блок просто пропускаем.
    InVoucher {
        voucher: Option<Voucher>,
        line: usize,
        text: String,
    },
}

/// Решает, попадёт ли законченная верификация в документ.
pub type VoucherFilter<'a> = Box<dyn FnMut(&Voucher) -> bool + 'a>;

pub struct DocumentBuilder<'a> {
    doc: Document,
    state: State,
    filter: Option<VoucherFilter<'a>>,
}

impl Default for DocumentBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> DocumentBuilder<'a> {
    pub fn new() -> Self {
        Self {
            doc: Document::default(),
            state: State::Idle,
            filter: None,
        }
    }

    /// Фильтр вызывается на закрывающей `}`; `false` — верификация отбрасывается
    /// без ошибки.
    pub fn with_voucher_filter(mut self, filter: impl FnMut(&Voucher) -> bool + 'a) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Обрабатывает одну физическую строку; `line_no` считается с 1.
    pub fn feed(&mut self, line_no: usize, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        if matches!(self.state, State::InVoucher { .. }) {
            self.feed_block(line_no, trimmed);
        } else {
            self.feed_top(line_no, trimmed);
        }
    }

    /// Завершает разбор. Незакрытый блок — ошибка, верификация теряется.
    pub fn finish(mut self) -> Document {
        if let State::InVoucher {
            voucher: Some(_),
            line,
            text,
        } = std::mem::replace(&mut self.state, State::Idle)
        {
            self.report(ParseError::new(line, text, LineError::UnterminatedVoucher));
        }
        log::debug!(
            "parsed {} accounts, {} dimensions, {} vouchers, {} errors",
            self.doc.accounts.len(),
            self.doc.dimensions.len(),
            self.doc.vouchers.len(),
            self.doc.errors.len()
        );
        self.doc
    }

    fn feed_top(&mut self, line_no: usize, line: &str) {
        let fields = tokenize(line);
        let Some(tag) = fields.first().map(|t| t.to_ascii_uppercase()) else {
            return;
        };
        if !tag.starts_with('#') {
            // не тег — молча пропускаем
            return;
        }

        match record::decode(&tag, &fields, line) {
            Ok(Record::VoucherHeader(header)) => self.open_voucher(line_no, line, header),
            Ok(Record::VoucherRow(_)) => {
                self.report(ParseError::new(line_no, line, LineError::RowOutsideVoucher))
            }
            Ok(record) => self.apply(record),
            Err(kind) => {
                if tag == "#VER" {
                    // блок всё равно надо съесть, иначе каждая #TRANS даст ошибку
                    self.state = State::InVoucher {
                        voucher: None,
                        line: line_no,
                        text: line.to_string(),
                    };
                }
                self.report(ParseError::new(line_no, line, kind));
            }
        }
    }

    fn feed_block(&mut self, line_no: usize, line: &str) {
        if line.starts_with('{') {
            return;
        }
        if line.starts_with('}') {
            if let State::InVoucher {
                voucher: Some(voucher),
                ..
            } = std::mem::replace(&mut self.state, State::Idle)
            {
                self.push_voucher(voucher);
            }
            return;
        }

        let fields = tokenize(line);
        let Some(tag) = fields.first().map(|t| t.to_ascii_uppercase()) else {
            return;
        };
        match tag.as_str() {
            "#TRANS" => match record::decode(&tag, &fields, line) {
                Ok(Record::VoucherRow(row)) => self.push_row(row),
                Ok(_) => {}
                Err(kind) => self.report(ParseError::new(line_no, line, kind)),
            },
            "#VER" => {
                // новый заголовок до `}` — прежняя верификация не закрыта
                if let State::InVoucher {
                    voucher: Some(_),
                    line: open_line,
                    text,
                } = std::mem::replace(&mut self.state, State::Idle)
                {
                    self.report(ParseError::new(
                        open_line,
                        text,
                        LineError::UnterminatedVoucher,
                    ));
                }
                self.feed_top(line_no, line);
            }
            _ => {}
        }
    }

    fn open_voucher(&mut self, line_no: usize, line: &str, h: VoucherHeader) {
        let mut voucher = Voucher::new(h.series, h.number, h.date);
        voucher.text = h.text;
        voucher.registration_date = h.registration_date;
        voucher.registration_sign = h.registration_sign;
        self.state = State::InVoucher {
            voucher: Some(voucher),
            line: line_no,
            text: line.to_string(),
        };
    }

    /// Заголовок не разобрался — проводки некуда класть, они теряются.
    fn push_row(&mut self, row: RowRecord) {
        let State::InVoucher {
            voucher: Some(voucher),
            ..
        } = &mut self.state
        else {
            return;
        };
        voucher.rows.push(VoucherRow {
            account: row.account,
            objects: row.objects,
            amount: row.amount,
            transaction_date: row.transaction_date.unwrap_or(voucher.date),
            text: row.text,
            quantity: row.quantity,
            registration_sign: row.registration_sign,
        });
    }

    fn apply(&mut self, record: Record) {
        match record {
            Record::CompanyName(name) => self.doc.company_name = Some(name),
            Record::RegistrationNumber(number) => self.doc.registration_number = Some(number),
            Record::Format(format) => self.doc.format = Some(format),
            Record::Generated(date) => self.set_generated(date),
            Record::Program { name, version } => self.set_program(name, version),
            Record::SieType(t) => self.doc.sie_type = Some(t),
            Record::Dimension { number, name } => self.insert_dimension(number, name),
            Record::Object {
                dimension,
                number,
                name,
            } => {
                self.insert_object(dimension, number, name);
            }
            Record::BookingYear(year) => self.push_booking_year(year),
            Record::Account { number, name } => self.insert_account(number, name),
            Record::AccountType { account, kind } => {
                self.with_account(&account, |a| a.account_type = Some(kind));
            }
            Record::Unit { account, unit } => {
                self.with_account(&account, |a| a.unit = Some(unit));
            }
            Record::Sru { account, code } => {
                self.with_account(&account, |a| a.sru_code = Some(code));
            }
            Record::Balance {
                kind,
                year,
                account,
                amount,
            } => {
                self.set_balance(kind, year, &account, amount);
            }
            Record::ObjectBalance {
                kind,
                year,
                object,
                amount,
                ..
            } => {
                if let Some(object) = object {
                    self.set_object_balance(kind, year, &object, amount);
                }
            }
            Record::PeriodValue {
                year,
                period,
                account,
                objects,
                amount,
                quantity,
            } => {
                let value = PeriodValue {
                    year,
                    booking_year: self.doc.booking_year(year).map(|y| y.id),
                    period,
                    objects,
                    value: amount,
                    quantity,
                };
                self.with_account(&account, |a| a.period_values.push(value));
            }
            Record::VoucherHeader(_) | Record::VoucherRow(_) | Record::Ignored => {}
        }
    }

    pub fn set_program(&mut self, name: String, version: Option<String>) {
        self.doc.program_name = Some(name);
        self.doc.program_version = version;
    }

    pub fn set_generated(&mut self, date: NaiveDate) {
        self.doc.generated = Some(date);
    }

    pub fn set_company(&mut self, name: Option<String>, registration_number: Option<String>) {
        if name.is_some() {
            self.doc.company_name = name;
        }
        if registration_number.is_some() {
            self.doc.registration_number = registration_number;
        }
    }

    /// Законченная верификация: из блока `{ }` или из XML. Проходит через фильтр.
    pub fn push_voucher(&mut self, voucher: Voucher) {
        if let Some(keep) = self.filter.as_mut() {
            if !keep(&voucher) {
                log::trace!("voucher {}{} rejected by filter", voucher.series, voucher.number);
                return;
            }
        }
        self.doc.vouchers.push(voucher);
    }

    pub fn insert_account(&mut self, number: String, name: String) {
        self.doc
            .accounts
            .entry(number.clone())
            .or_insert_with(|| Account::new(number, ""))
            .name = name;
    }

    pub fn insert_dimension(&mut self, number: String, name: String) {
        let dim = Dimension {
            number,
            name,
            ..Default::default()
        };
        match self.doc.dimensions.iter_mut().find(|d| d.number == dim.number) {
            Some(existing) => *existing = dim,
            None => self.doc.dimensions.push(dim),
        }
    }

    /// Измерение должно быть объявлено раньше; иначе объект отбрасывается.
    pub fn insert_object(&mut self, dimension: String, number: String, name: String) -> bool {
        let Some(dim) = self.doc.dimensions.iter_mut().find(|d| d.number == dimension) else {
            log::trace!("object {number} dropped: dimension {dimension} not declared");
            return false;
        };
        dim.objects.insert(
            number.clone(),
            SieObject {
                dimension,
                number,
                name,
                ..Default::default()
            },
        );
        true
    }

    pub fn push_booking_year(&mut self, year: BookingYear) {
        self.doc.booking_years.push(year);
    }

    /// Неизвестный счёт — запись молча пропускается.
    pub fn with_account(&mut self, number: &str, f: impl FnOnce(&mut Account)) -> bool {
        match self.doc.accounts.get_mut(number) {
            Some(account) => {
                f(account);
                true
            }
            None => {
                log::trace!("record dropped: account {number} not declared");
                false
            }
        }
    }

    /// Сальдо счёта хранится только для текущего года (индекс 0).
    pub fn set_balance(
        &mut self,
        kind: BalanceKind,
        year: i32,
        account: &str,
        amount: Decimal,
    ) -> bool {
        if year != 0 {
            return false;
        }
        self.with_account(account, |a| match kind {
            BalanceKind::Opening => a.opening_balance = amount,
            BalanceKind::Closing => a.closing_balance = amount,
            BalanceKind::Result => a.result = amount,
        })
    }

    pub fn set_object_balance(
        &mut self,
        kind: BalanceKind,
        year: i32,
        object: &ObjectRef,
        amount: Decimal,
    ) -> bool {
        if year != 0 {
            return false;
        }
        let target = self
            .doc
            .dimensions
            .iter_mut()
            .find(|d| d.number == object.dimension)
            .and_then(|d| d.objects.get_mut(&object.object));
        match (target, kind) {
            (Some(o), BalanceKind::Opening) => o.opening_balance = amount,
            (Some(o), BalanceKind::Closing) => o.closing_balance = amount,
            (Some(_), BalanceKind::Result) => return false,
            (None, _) => {
                log::trace!(
                    "object balance dropped: {} {} not declared",
                    object.dimension,
                    object.object
                );
                return false;
            }
        }
        true
    }

    pub fn report(&mut self, err: ParseError) {
        log::debug!("{err}");
        self.doc.errors.push(err);
    }
}
