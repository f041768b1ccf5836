//! Запись документа в текст SIE 4 в каноническом порядке.
//!
//! Порядок не зависит от исходного файла: заголовок, компания, годы, счета,
//! измерения, сальдо, верификации по дате. Текстовые поля берутся в кавычки
//! по тем же правилам, по которым их потом прочитает `tokenize`.

use crate::{
    encoding::Encoding,
    model::{Account, Document, ObjectRef, Voucher, VoucherRow},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt::Write as FmtWrite;

const DATE_FORMAT: &str = "%Y%m%d";

/// Что писать в заголовок файла.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub program_name: String,
    pub program_version: String,
    /// None — сегодняшняя дата.
    pub generated: Option<NaiveDate>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            program_name: env!("CARGO_PKG_NAME").to_string(),
            program_version: env!("CARGO_PKG_VERSION").to_string(),
            generated: None,
        }
    }
}

enum Field<'a> {
    /// Кавычки по правилам, см. `needs_quotes`.
    Text(&'a str),
    /// Числа, даты, списки объектов — как есть.
    Raw(String),
}

fn date(d: NaiveDate) -> Field<'static> {
    Field::Raw(d.format(DATE_FORMAT).to_string())
}

fn amount(a: Decimal) -> Field<'static> {
    Field::Raw(a.to_string())
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s
            .chars()
            .any(|c| matches!(c, ' ' | '\t' | '\\' | '"' | '{' | '}'))
}

/// `\` и `"` экранируются обратной косой, остальное как есть.
fn push_text(out: &mut String, s: &str) {
    if !needs_quotes(s) {
        out.push_str(s);
        return;
    }
    out.push('"');
    for c in s.chars() {
        if matches!(c, '\\' | '"') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

fn line(out: &mut String, tag: &str, fields: &[Field<'_>]) {
    out.push_str(tag);
    for field in fields {
        out.push(' ');
        match field {
            Field::Raw(s) => out.push_str(s),
            Field::Text(s) => push_text(out, s),
        }
    }
    out.push('\n');
}

/// `{}` или `{1 "100" 2 "200"}`. Номер объекта всегда в кавычках.
pub fn format_objects(objects: &[ObjectRef]) -> String {
    let mut s = String::from("{");
    for (i, o) in objects.iter().enumerate() {
        if i > 0 {
            s.push(' ');
        }
        push_text(&mut s, &o.dimension);
        s.push(' ');
        if needs_quotes(&o.object) {
            push_text(&mut s, &o.object);
        } else {
            let _ = write!(s, "\"{}\"", o.object);
        }
    }
    s.push('}');
    s
}

/// `enc` влияет только на `#FORMAT`: метка PC8 в UTF-8 файл не пишется.
pub fn render(doc: &Document, opts: &WriteOptions, enc: Encoding) -> String {
    let mut s = String::new();

    line(&mut s, "#FLAGGA", &[Field::Raw("0".into())]);
    line(
        &mut s,
        "#PROGRAM",
        &[
            Field::Text(&opts.program_name),
            Field::Text(&opts.program_version),
        ],
    );
    let format = doc
        .format
        .as_deref()
        .filter(|f| enc == Encoding::Pc8 || !f.eq_ignore_ascii_case("PC8"));
    if let Some(format) = format {
        line(&mut s, "#FORMAT", &[Field::Text(format)]);
    }
    let generated = opts
        .generated
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    line(&mut s, "#GEN", &[date(generated)]);
    line(
        &mut s,
        "#SIETYP",
        &[Field::Text(doc.sie_type.as_deref().unwrap_or("4"))],
    );
    if let Some(name) = &doc.company_name {
        line(&mut s, "#FNAMN", &[Field::Text(name)]);
    }
    if let Some(orgnr) = doc.registration_number.as_deref().filter(|n| !n.is_empty()) {
        line(&mut s, "#ORGNR", &[Field::Text(orgnr)]);
    }

    for y in &doc.booking_years {
        line(
            &mut s,
            "#RAR",
            &[Field::Raw(y.id.to_string()), date(y.start), date(y.end)],
        );
    }

    // BTreeMap уже отсортирован по номеру счёта
    for a in doc.accounts.values() {
        line(&mut s, "#KONTO", &[Field::Text(&a.number), Field::Text(&a.name)]);
    }
    for a in doc.accounts.values() {
        if let Some(t) = &a.account_type {
            line(&mut s, "#KTYP", &[Field::Text(&a.number), Field::Text(t)]);
        }
    }
    for a in doc.accounts.values() {
        if let Some(unit) = &a.unit {
            line(&mut s, "#ENHET", &[Field::Text(&a.number), Field::Text(unit)]);
        }
    }
    for a in doc.accounts.values() {
        if let Some(sru) = a.sru_code.as_deref().filter(|c| !c.is_empty()) {
            line(&mut s, "#SRU", &[Field::Text(&a.number), Field::Text(sru)]);
        }
    }

    for d in &doc.dimensions {
        line(&mut s, "#DIM", &[Field::Text(&d.number), Field::Text(&d.name)]);
    }
    for d in &doc.dimensions {
        for o in d.objects.values() {
            line(
                &mut s,
                "#OBJEKT",
                &[
                    Field::Text(&d.number),
                    Field::Text(&o.number),
                    Field::Text(&o.name),
                ],
            );
        }
    }

    write_balances(&mut s, doc, "#IB", |a| a.opening_balance);
    write_balances(&mut s, doc, "#UB", |a| a.closing_balance);
    write_balances(&mut s, doc, "#RES", |a| a.result);

    for a in doc.accounts.values() {
        for pv in &a.period_values {
            let mut fields = vec![
                Field::Raw(pv.year.to_string()),
                Field::Text(&pv.period),
                Field::Text(&a.number),
                Field::Raw(format_objects(&pv.objects)),
                amount(pv.value),
            ];
            if let Some(q) = pv.quantity {
                fields.push(amount(q));
            }
            line(&mut s, "#PSALDO", &fields);
        }
    }

    // sort_by_key стабилен: при равных датах сохраняется порядок файла
    let mut vouchers: Vec<&Voucher> = doc.vouchers.iter().collect();
    vouchers.sort_by_key(|v| v.date);
    for v in vouchers {
        write_voucher(&mut s, v);
    }
    s
}

fn write_balances(
    s: &mut String,
    doc: &Document,
    tag: &str,
    value: impl Fn(&Account) -> Decimal,
) {
    for a in doc.accounts.values() {
        let v = value(a);
        if v.is_zero() {
            continue;
        }
        line(
            s,
            tag,
            &[Field::Raw("0".into()), Field::Text(&a.number), amount(v)],
        );
    }
}

fn write_voucher(s: &mut String, v: &Voucher) {
    let mut fields = vec![
        Field::Text(&v.series),
        Field::Text(&v.number),
        date(v.date),
        Field::Text(&v.text),
    ];
    if v.registration_date.is_some() || v.registration_sign.is_some() {
        fields.push(match v.registration_date {
            Some(d) => date(d),
            None => Field::Text(""),
        });
    }
    if let Some(sign) = &v.registration_sign {
        fields.push(Field::Text(sign));
    }
    line(s, "#VER", &fields);
    s.push_str("{\n");
    for row in &v.rows {
        write_row(s, row);
    }
    s.push_str("}\n");
}

fn write_row(s: &mut String, row: &VoucherRow) {
    let mut fields = vec![
        Field::Text(&row.account),
        Field::Raw(format_objects(&row.objects)),
        amount(row.amount),
        date(row.transaction_date),
        Field::Text(&row.text),
    ];
    if row.quantity.is_some() || row.registration_sign.is_some() {
        fields.push(match row.quantity {
            Some(q) => amount(q),
            None => Field::Text(""),
        });
    }
    if let Some(sign) = &row.registration_sign {
        fields.push(Field::Text(sign));
    }
    line(s, "#TRANS", &fields);
}
