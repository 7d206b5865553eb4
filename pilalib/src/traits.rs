//! Чтение/запись файла PILA поверх std::io::{BufRead, Write}.

use crate::{error::Result, file::PilaFile};
use std::io::{BufRead, Write};

pub trait ReadFormat {
    fn read<R: BufRead>(r: R) -> Result<PilaFile>;
}

pub trait WriteFormat {
    fn write<W: Write>(w: W, file: &PilaFile) -> Result<()>;
}

pub trait Format: ReadFormat + WriteFormat {}
impl<T: ReadFormat + WriteFormat> Format for T {}
