//! Строка фиксированной ширины с адресацией колонок 1..=len (как в техническом приложении PILA).

use crate::error::{PilaError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct FixedWidthLine {
    len: usize,
    buf: Vec<char>,
}

impl FixedWidthLine {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            buf: vec![' '; len],
        }
    }

    /// Загружает готовую строку, чтобы читать её колонки.
    pub fn parse(len: usize, line: &str) -> Result<Self> {
        let buf: Vec<char> = line.chars().collect();
        if buf.len() != len {
            return Err(PilaError::RecordLength {
                record: "input",
                expected: len,
                actual: buf.len(),
            });
        }
        Ok(Self { len, buf })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn span(&self, start: usize, end: usize) -> Result<std::ops::Range<usize>> {
        if start < 1 || end > self.len || start > end {
            return Err(PilaError::ColumnRange {
                start,
                end,
                len: self.len,
            });
        }
        Ok(start - 1..end)
    }

    /// Пишет `value` в колонки `start..=end`, дополняя `pad` с нужной стороны.
    pub fn write(&mut self, start: usize, end: usize, value: &str, align: Align, pad: char) -> Result<()> {
        let range = self.span(start, end)?;
        let width = range.len();
        let text: Vec<char> = value.chars().collect();
        if text.len() > width {
            return Err(PilaError::FieldOverflow {
                start,
                end,
                width,
                value: value.to_string(),
            });
        }
        let fill = std::iter::repeat(pad).take(width - text.len());
        let cells: Vec<char> = match align {
            Align::Left => text.into_iter().chain(fill).collect(),
            Align::Right => fill.chain(text).collect(),
        };
        self.buf[range].copy_from_slice(&cells);
        Ok(())
    }

    /// Числовое поле: справа, нули слева.
    pub fn write_numeric(&mut self, start: usize, end: usize, value: i64) -> Result<()> {
        if value < 0 {
            return Err(PilaError::NegativeValue { start, end, value });
        }
        self.write(start, end, &value.to_string(), Align::Right, '0')
    }

    /// То же для суммы с дробной частью: дробь отбрасывается (к нулю).
    pub fn write_amount(&mut self, start: usize, end: usize, value: Decimal) -> Result<()> {
        let whole = value.trunc().to_i64().ok_or_else(|| PilaError::FieldOverflow {
            start,
            end,
            width: end.saturating_sub(start) + 1,
            value: value.to_string(),
        })?;
        self.write_numeric(start, end, whole)
    }

    /// Алфавитно-цифровое поле: слева, пробелы справа.
    pub fn write_text(&mut self, start: usize, end: usize, value: &str) -> Result<()> {
        self.write(start, end, value, Align::Left, ' ')
    }

    /// Копирует готовый фрагмент ровно по ширине диапазона (клон ещё не размеченных колонок).
    pub fn write_raw(&mut self, start: usize, end: usize, raw: &str) -> Result<()> {
        let range = self.span(start, end)?;
        let cells: Vec<char> = raw.chars().collect();
        if cells.len() != range.len() {
            return Err(PilaError::RawWidth {
                start,
                end,
                expected: range.len(),
                actual: cells.len(),
            });
        }
        self.buf[range].copy_from_slice(&cells);
        Ok(())
    }

    /// Содержимое колонок `start..=end` как есть.
    pub fn read(&self, start: usize, end: usize) -> Result<String> {
        let range = self.span(start, end)?;
        Ok(self.buf[range].iter().collect())
    }

    pub fn render(&self) -> Result<String> {
        let line: String = self.buf.iter().collect();
        let actual = line.chars().count();
        if actual != self.len {
            return Err(PilaError::RecordLength {
                record: "fixed-width",
                expected: self.len,
                actual,
            });
        }
        Ok(line)
    }
}
