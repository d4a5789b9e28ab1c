//! Bet record and its comma-separated wire form.
//!
//! Two text shapes exist:
//!
//! - the **wire form** sent to the server, six fields:
//!   `agency,document,name,surname,birth_date,number`
//! - the **input form** read from agency files, five fields:
//!   `name,surname,document,birth_date,number` (the agency is known out of band)
//!
//! No escaping is performed, so field values must not contain [`FIELD_SEPARATOR`].
//! [`Bet::new`] enforces this.

use std::fmt;
use std::str::FromStr;

use crate::error::{BetwireError, Result};

/// Separator between the fields of a serialized bet.
pub const FIELD_SEPARATOR: char = ',';

const WIRE_FIELDS: usize = 6;
const INPUT_FIELDS: usize = 5;

/// Environment variables read by [`Bet::from_env`].
const DOCUMENT_ENV: &str = "DOCUMENTO";
const NAME_ENV: &str = "NOMBRE";
const SURNAME_ENV: &str = "APELLIDO";
const BIRTH_DATE_ENV: &str = "NACIMIENTO";
const NUMBER_ENV: &str = "NUMERO";

/// A single bet. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bet {
    agency_id: u32,
    client_id: u64,
    name: String,
    surname: String,
    birth_date: String,
    number: u32,
}

impl Bet {
    /// Create a bet, rejecting text fields that contain the field separator.
    pub fn new(
        agency_id: u32,
        client_id: u64,
        name: impl Into<String>,
        surname: impl Into<String>,
        birth_date: impl Into<String>,
        number: u32,
    ) -> Result<Self> {
        let bet = Self {
            agency_id,
            client_id,
            name: name.into(),
            surname: surname.into(),
            birth_date: birth_date.into(),
            number,
        };

        for (field, value) in [
            ("name", &bet.name),
            ("surname", &bet.surname),
            ("birth_date", &bet.birth_date),
        ] {
            if value.contains(FIELD_SEPARATOR) {
                return Err(BetwireError::malformed(
                    value,
                    format!("{field} contains '{FIELD_SEPARATOR}'"),
                ));
            }
        }

        Ok(bet)
    }

    /// Build a bet from the `DOCUMENTO`, `NOMBRE`, `APELLIDO`, `NACIMIENTO`
    /// and `NUMERO` environment variables.
    pub fn from_env(agency_id: u32) -> Result<Self> {
        Self::from_lookup(agency_id, |key| std::env::var(key).ok())
    }

    /// Same as [`Bet::from_env`] with an arbitrary key lookup.
    pub fn from_lookup<F>(agency_id: u32, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).unwrap_or_default();
        let number = |key: &str| {
            let raw = text(key);
            raw.trim().parse::<u64>().map_err(|_| {
                BetwireError::Configuration(format!("{key} must be numeric, got {raw:?}"))
            })
        };

        let client_id = number(DOCUMENT_ENV)?;
        let bet_number = u32::try_from(number(NUMBER_ENV)?)
            .map_err(|_| BetwireError::Configuration(format!("{NUMBER_ENV} is out of range")))?;

        Self::new(
            agency_id,
            client_id,
            text(NAME_ENV),
            text(SURNAME_ENV),
            text(BIRTH_DATE_ENV),
            bet_number,
        )
        .map_err(|e| BetwireError::Configuration(e.to_string()))
    }

    #[inline]
    pub fn agency_id(&self) -> u32 {
        self.agency_id
    }

    /// Document number of the bettor.
    #[inline]
    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn surname(&self) -> &str {
        &self.surname
    }

    #[inline]
    pub fn birth_date(&self) -> &str {
        &self.birth_date
    }

    /// The number the bet was placed on.
    #[inline]
    pub fn number(&self) -> u32 {
        self.number
    }
}

impl fmt::Display for Bet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{}",
            self.agency_id, self.client_id, self.name, self.surname, self.birth_date, self.number
        )
    }
}

impl FromStr for Bet {
    type Err = BetwireError;

    fn from_str(s: &str) -> Result<Self> {
        BetCodec::deserialize(s)
    }
}

/// Text codec for bets.
pub struct BetCodec;

impl BetCodec {
    /// Serialize to the six-field wire form.
    #[inline]
    pub fn serialize(bet: &Bet) -> String {
        bet.to_string()
    }

    /// Parse a five-field input line (`name,surname,document,birth_date,number`)
    /// for the given agency.
    ///
    /// # Errors
    ///
    /// [`BetwireError::MalformedRecord`] if the field count is wrong or a
    /// numeric field is not an integer.
    pub fn parse(agency_id: u32, line: &str) -> Result<Bet> {
        let line = trim_line(line);
        let fields = split_exact::<INPUT_FIELDS>(line)?;

        Bet::new(
            agency_id,
            parse_field(line, "document", fields[2])?,
            fields[0],
            fields[1],
            fields[3],
            parse_field(line, "number", fields[4])?,
        )
    }

    /// Parse the six-field wire form produced by [`BetCodec::serialize`].
    pub fn deserialize(line: &str) -> Result<Bet> {
        let line = trim_line(line);
        let fields = split_exact::<WIRE_FIELDS>(line)?;

        Bet::new(
            parse_field(line, "agency", fields[0])?,
            parse_field(line, "document", fields[1])?,
            fields[2],
            fields[3],
            fields[4],
            parse_field(line, "number", fields[5])?,
        )
    }
}

fn trim_line(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

fn split_exact<const N: usize>(line: &str) -> Result<[&str; N]> {
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    <[&str; N]>::try_from(fields).map_err(|fields| {
        BetwireError::malformed(
            line,
            format!("expected {N} fields, found {}", fields.len()),
        )
    })
}

fn parse_field<T: FromStr>(line: &str, field: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| BetwireError::malformed(line, format!("{field} {raw:?} is not an integer")))
}
