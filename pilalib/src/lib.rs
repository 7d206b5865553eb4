//! pilalib: расчёт взносов PILA и запись файла фиксированной ширины (регистры 01/02)

pub mod error;
pub mod model;
pub mod config;
pub mod rounding;
pub mod traits;
pub mod calculator;
pub mod payload;
pub mod store;
pub mod file;
pub mod report;
pub mod service;

pub mod records {
    pub mod line;
    pub mod layout;
    pub mod header;
    pub mod detail;
}
