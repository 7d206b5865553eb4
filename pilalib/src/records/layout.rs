//! Декларативная разметка записи: упорядоченная таблица (поле, колонки, вид кодирования)
//! и один обобщённый кодек поверх `FixedWidthLine`.

use super::line::{Align, FixedWidthLine};
use crate::error::{PilaError, Result};
use std::borrow::Cow;
use std::fmt::Debug;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Слева, пробелы справа.
    Alpha,
    /// Справа, нули слева.
    Numeric,
    /// Готовый фрагмент ровно по ширине.
    Raw,
}

#[derive(Debug, Clone, Copy)]
pub struct Column<F> {
    pub field: F,
    pub start: usize,
    pub end: usize,
    pub kind: Kind,
}

impl<F> Column<F> {
    pub const fn new(field: F, start: usize, end: usize, kind: Kind) -> Self {
        Self {
            field,
            start,
            end,
            kind,
        }
    }

    pub fn width(&self) -> usize {
        self.end + 1 - self.start
    }
}

/// Значение поля для записи. `Keep` оставляет колонки как есть (пробелы или клон хвоста).
#[derive(Debug, Clone, PartialEq)]
pub enum Cell<'a> {
    Text(Cow<'a, str>),
    Number(i64),
    Keep,
}

impl<'a> Cell<'a> {
    pub fn text(s: &'a str) -> Self {
        Cell::Text(Cow::Borrowed(s))
    }

    pub fn owned(s: String) -> Self {
        Cell::Text(Cow::Owned(s))
    }

    pub fn opt_text(s: Option<&'a str>) -> Self {
        s.map_or(Cell::Keep, Cell::text)
    }

    pub fn opt_number(n: Option<i64>) -> Self {
        n.map_or(Cell::Keep, Cell::Number)
    }
}

/// Запись, которую можно разложить по таблице колонок.
pub trait Layout {
    type Field: Copy + PartialEq + Debug + 'static;

    const NAME: &'static str;
    const LEN: usize;
    /// Порядок важен: более поздние колонки перекрывают более ранние.
    const COLUMNS: &'static [Column<Self::Field>];

    fn cell(&self, field: Self::Field) -> Cell<'_>;
}

/// Пишет поля по таблице. Числовой ноль поверх пустых колонок сырого фрагмента
/// не пишется: пустое поле исходной строки остаётся пустым.
pub fn encode<L: Layout>(record: &L) -> Result<String> {
    let mut line = FixedWidthLine::new(L::LEN);
    let mut raw_spans: Vec<(usize, usize)> = Vec::new();
    for col in L::COLUMNS {
        let (start, end) = (col.start, col.end);
        match (col.kind, record.cell(col.field)) {
            (_, Cell::Keep) => {}
            (Kind::Raw, Cell::Text(t)) => {
                line.write_raw(start, end, &t)?;
                raw_spans.push((start, end));
            }
            (Kind::Raw, Cell::Number(n)) => {
                line.write_raw(start, end, &n.to_string())?;
                raw_spans.push((start, end));
            }
            (Kind::Numeric, Cell::Number(0)) if blank_raw(&line, &raw_spans, start, end) => {}
            (Kind::Alpha, Cell::Text(t)) => line.write_text(start, end, &t)?,
            (Kind::Numeric, Cell::Text(t)) => line.write(start, end, &t, Align::Right, '0')?,
            (Kind::Numeric, Cell::Number(n)) => line.write_numeric(start, end, n)?,
            (Kind::Alpha, Cell::Number(n)) => line.write_text(start, end, &n.to_string())?,
        }
    }
    fit_record_length(line.render()?, L::LEN, L::NAME)
}

fn blank_raw(line: &FixedWidthLine, raw_spans: &[(usize, usize)], start: usize, end: usize) -> bool {
    raw_spans.iter().any(|&(s, e)| s <= start && end <= e)
        && line.read(start, end).is_ok_and(|t| t.trim().is_empty())
}

/// Финальная проверка длины. Ровно на один символ длиннее: известный
/// дефект приёмника, обрезаем с предупреждением. Иначе ошибка.
pub fn fit_record_length(rendered: String, len: usize, record: &'static str) -> Result<String> {
    let actual = rendered.chars().count();
    if actual == len {
        return Ok(rendered);
    }
    if actual == len + 1 {
        warn!(record, expected = len, actual, "record one char too long, truncating last char");
        return Ok(rendered.chars().take(len).collect());
    }
    Err(PilaError::RecordLength {
        record,
        expected: len,
        actual,
    })
}

/// Разобранная строка, из которой поля достаются по той же таблице.
pub struct Decoded<L: Layout> {
    line: FixedWidthLine,
    _layout: std::marker::PhantomData<L>,
}

impl<L: Layout> Decoded<L> {
    pub fn parse(text: &str) -> Result<Self> {
        let line = FixedWidthLine::parse(L::LEN, text).map_err(|e| match e {
            PilaError::RecordLength { expected, actual, .. } => PilaError::RecordLength {
                record: L::NAME,
                expected,
                actual,
            },
            other => other,
        })?;
        Ok(Self {
            line,
            _layout: std::marker::PhantomData,
        })
    }

    fn column(&self, field: L::Field) -> Result<&'static Column<L::Field>> {
        L::COLUMNS
            .iter()
            .find(|c| c.field == field)
            .ok_or_else(|| PilaError::Parse(format!("{} has no column for {field:?}", L::NAME)))
    }

    /// Колонки как есть.
    pub fn raw(&self, field: L::Field) -> Result<String> {
        let col = self.column(field)?;
        self.line.read(col.start, col.end)
    }

    /// Текст без хвостовых пробелов.
    pub fn text(&self, field: L::Field) -> Result<String> {
        Ok(self.raw(field)?.trim_end().to_string())
    }

    /// Непустой текст или `None`.
    pub fn opt_text(&self, field: L::Field) -> Result<Option<String>> {
        let t = self.text(field)?;
        Ok(if t.trim().is_empty() { None } else { Some(t) })
    }

    /// Число; пустые колонки дают 0.
    pub fn number(&self, field: L::Field) -> Result<i64> {
        Ok(self.opt_number(field)?.unwrap_or(0))
    }

    pub fn opt_number(&self, field: L::Field) -> Result<Option<i64>> {
        let raw = self.raw(field)?;
        let t = raw.trim();
        if t.is_empty() {
            return Ok(None);
        }
        t.parse::<i64>()
            .map(Some)
            .map_err(|e| PilaError::Parse(format!("{} {field:?} '{t}': {e}", L::NAME)))
    }

    /// Флаг новедада: `X` есть, пробел нет.
    pub fn flag(&self, field: L::Field) -> Result<bool> {
        Ok(!self.raw(field)?.trim().is_empty())
    }
}
