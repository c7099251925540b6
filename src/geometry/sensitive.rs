// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Sensitive detector definitions and their readout banks

use crate::error::{GeometryError, GeometryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a bank row stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BankSource {
    /// Raw integrated variables
    Raw,
    /// Digitized integrated variables
    Digitized,
    /// Raw step by step variables
    Step,
    /// Digitized multi-hit variables
    MultiHit,
    /// Voltage(time) variables
    Voltage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BankValue {
    Integer,
    Double,
}

/// Two character bank row type, e.g. `Di` or `Rd`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BankType {
    pub source: BankSource,
    pub value: BankValue,
}

impl FromStr for BankType {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let (Some(source), Some(value), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(GeometryError::Parse(format!("bank type '{}' must be two characters", s)));
        };
        let source = match source {
            'R' => BankSource::Raw,
            'D' => BankSource::Digitized,
            'S' => BankSource::Step,
            'M' => BankSource::MultiHit,
            'V' => BankSource::Voltage,
            other => return Err(GeometryError::Parse(format!("unknown bank source '{}'", other))),
        };
        let value = match value {
            'i' => BankValue::Integer,
            'd' => BankValue::Double,
            other => return Err(GeometryError::Parse(format!("unknown bank value '{}'", other))),
        };
        Ok(Self { source, value })
    }
}

impl fmt::Display for BankType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            BankSource::Raw => 'R',
            BankSource::Digitized => 'D',
            BankSource::Step => 'S',
            BankSource::MultiHit => 'M',
            BankSource::Voltage => 'V',
        };
        let value = match self.value {
            BankValue::Integer => 'i',
            BankValue::Double => 'd',
        };
        write!(f, "{}{}", source, value)
    }
}

impl TryFrom<String> for BankType {
    type Error = GeometryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BankType> for String {
    fn from(kind: BankType) -> Self {
        kind.to_string()
    }
}

/// One row of an EVIO bank definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankRow {
    pub name: String,
    pub comment: String,
    pub id: i64,
    pub kind: BankType,
}

/// Readout definition shared by all volumes with the same sensitivity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitiveDetector {
    pub name: String,
    pub description: String,
    /// Space separated identifier names, e.g. `"sector layer paddle"`
    pub identifiers: String,
    pub signal_threshold: String,
    pub time_window: String,
    pub prod_threshold: String,
    pub max_step: String,
    pub rise_time: String,
    pub fall_time: String,
    pub mv_to_mev: String,
    pub pedestal: String,
    pub delay: String,
    pub bank_id: i64,
    bank_rows: Vec<BankRow>,
}

impl SensitiveDetector {
    /// New definition with the standard GEMC thresholds and the `bankid` row
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        identifiers: impl Into<String>,
        bank_id: i64,
    ) -> Self {
        let name = name.into();
        let bankid_row = BankRow {
            name: "bankid".into(),
            comment: format!("{} bank id", name),
            id: bank_id,
            kind: BankType {
                source: BankSource::Digitized,
                value: BankValue::Integer,
            },
        };
        Self {
            name,
            description: description.into(),
            identifiers: identifiers.into(),
            signal_threshold: "0*MeV".into(),
            time_window: "10*ns".into(),
            prod_threshold: "0*mm".into(),
            max_step: "1*mm".into(),
            rise_time: "1*ns".into(),
            fall_time: "1*ns".into(),
            mv_to_mev: "1".into(),
            pedestal: "0".into(),
            delay: "0*ns".into(),
            bank_id,
            bank_rows: vec![bankid_row],
        }
    }

    pub fn with_thresholds(
        mut self,
        signal: impl Into<String>,
        time_window: impl Into<String>,
        production: impl Into<String>,
    ) -> Self {
        self.signal_threshold = signal.into();
        self.time_window = time_window.into();
        self.prod_threshold = production.into();
        self
    }

    pub fn with_max_step(mut self, max_step: impl Into<String>) -> Self {
        self.max_step = max_step.into();
        self
    }

    /// Add a row to the bank definition. `kind` is the two character type.
    pub fn add_bank_row(
        &mut self,
        name: impl Into<String>,
        comment: impl Into<String>,
        id: i64,
        kind: &str,
    ) -> GeometryResult<()> {
        self.bank_rows.push(BankRow {
            name: name.into(),
            comment: comment.into(),
            id,
            kind: kind.parse()?,
        });
        Ok(())
    }

    pub fn bank_rows(&self) -> &[BankRow] {
        &self.bank_rows
    }

    /// Hit definition line (`<det>__hit_<variation>.txt`)
    pub fn hit_line(&self) -> String {
        [
            self.name.as_str(),
            &self.description,
            &self.identifiers,
            &self.signal_threshold,
            &self.time_window,
            &self.prod_threshold,
            &self.max_step,
            &self.rise_time,
            &self.fall_time,
            &self.mv_to_mev,
            &self.pedestal,
            &self.delay,
        ]
        .join(" | ")
    }

    /// One line per bank row (`<det>__bank.txt`)
    pub fn bank_lines(&self) -> Vec<String> {
        self.bank_rows
            .iter()
            .map(|row| {
                format!(
                    "{} | {} | {} | {} | {}",
                    self.name, row.name, row.comment, row.id, row.kind
                )
            })
            .collect()
    }

    /// Identity column for a volume with the given identifier values
    pub fn identity(&self, indexes: &[i64]) -> GeometryResult<String> {
        let ids: Vec<&str> = self.identifiers.split_whitespace().collect();
        if ids.len() != indexes.len() {
            return Err(GeometryError::IdentityMismatch {
                name: self.name.clone(),
                expected: ids.len(),
                found: indexes.len(),
            });
        }
        Ok(ids
            .iter()
            .zip(indexes)
            .map(|(id, index)| format!("{} manual {}", id, index))
            .collect::<Vec<_>>()
            .join(" "))
    }
}

impl fmt::Display for SensitiveDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.hit_line())?;
        writeln!(f, "{}", "-".repeat(80))?;
        for line in self.bank_lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_has_bankid_row() {
        let sd = SensitiveDetector::new("hodo", "Hodoscope", "layer paddle", 700);
        assert_eq!(sd.bank_rows().len(), 1);
        assert_eq!(sd.bank_lines()[0], "hodo | bankid | hodo bank id | 700 | Di");
        assert_eq!(
            sd.hit_line(),
            "hodo | Hodoscope | layer paddle | 0*MeV | 10*ns | 0*mm | 1*mm | 1*ns | 1*ns | 1 | 0 | 0*ns"
        );
    }

    #[test]
    fn test_bank_rows() {
        let mut sd = SensitiveDetector::new("hodo", "Hodoscope", "layer paddle", 700);
        sd.add_bank_row("adc", "ADC counts", 5, "Ri").unwrap();
        sd.add_bank_row("time", "TDC", 6, "Sd").unwrap();
        assert!(sd.add_bank_row("bad", "bad", 7, "Xi").is_err());
        assert!(sd.add_bank_row("bad", "bad", 7, "Rii").is_err());
        assert_eq!(sd.bank_rows().len(), 3);
        assert_eq!(sd.bank_rows()[2].kind.to_string(), "Sd");
    }

    #[test]
    fn test_identity() {
        let sd = SensitiveDetector::new("hodo", "Hodoscope", "layer paddle", 700);
        assert_eq!(sd.identity(&[1, 12]).unwrap(), "layer manual 1 paddle manual 12");
        assert!(matches!(
            sd.identity(&[1]),
            Err(GeometryError::IdentityMismatch { expected: 2, found: 1, .. })
        ));
    }
}
