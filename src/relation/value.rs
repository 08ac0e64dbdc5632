//! Typed cell values and the per-column casting applied when relations are loaded.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use time::{Date, Month};

/// A single cell of a tuple.
///
/// Columns are cast once, as a whole, so every value of a loaded column carries the
/// same variant. Outer joins may mix in the string padding sentinel.
#[derive(Clone, Debug)]
pub enum Value {
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit floating point number.
    Float(f64),
    /// Calendar date.
    Date(Date),
    /// UTF-8 string.
    Str(String),
}

/// Column types in casting priority order (most specific first).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ValueType {
    /// Every value parses as an integer.
    Int,
    /// Every value parses as a calendar date.
    Date,
    /// Every value parses as a float (integers included).
    Float,
    /// Fallback.
    Str,
}

impl ValueType {
    const PRIORITY: [ValueType; 4] = [
        ValueType::Int,
        ValueType::Date,
        ValueType::Float,
        ValueType::Str,
    ];

    fn bit(self) -> u8 {
        match self {
            ValueType::Int => 0b0001,
            ValueType::Date => 0b0010,
            ValueType::Float => 0b0100,
            ValueType::Str => 0b1000,
        }
    }

    /// Types a single raw cell can be read as.
    fn admitted(raw: &str) -> u8 {
        let trimmed = raw.trim();
        let mut mask = ValueType::Str.bit();
        if parse_int(trimmed).is_some() {
            mask |= ValueType::Int.bit() | ValueType::Float.bit();
        } else if parse_float(trimmed).is_some() {
            mask |= ValueType::Float.bit();
        } else if parse_date(trimmed).is_some() {
            mask |= ValueType::Date.bit();
        }
        mask
    }

    /// Infers the most specific type every raw value of a column admits.
    ///
    /// An empty column reads as integers, which is harmless since it has no cells.
    pub fn infer<'a, I>(column: I) -> ValueType
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mask = column
            .into_iter()
            .fold(0b1111u8, |acc, raw| acc & ValueType::admitted(raw));
        ValueType::PRIORITY
            .into_iter()
            .find(|ty| mask & ty.bit() != 0)
            .unwrap_or(ValueType::Str)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Int => "int",
            ValueType::Date => "date",
            ValueType::Float => "float",
            ValueType::Str => "string",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Casts a raw cell to `ty`, falling back to a string when the cell does not fit.
    pub fn cast(raw: &str, ty: ValueType) -> Value {
        let trimmed = raw.trim();
        let typed = match ty {
            ValueType::Int => parse_int(trimmed).map(Value::Int),
            ValueType::Float => parse_float(trimmed).map(Value::Float),
            ValueType::Date => parse_date(trimmed).map(Value::Date),
            ValueType::Str => None,
        };
        typed.unwrap_or_else(|| Value::Str(raw.to_owned()))
    }

    /// Reads a standalone raw value with the same priority used for columns.
    pub fn infer(raw: &str) -> Value {
        Value::cast(raw, ValueType::infer([raw]))
    }

    /// Returns the type tag of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Date(_) => ValueType::Date,
            Value::Str(_) => ValueType::Str,
        }
    }

    /// Ints and floats share a rank so they interleave by numeric value.
    fn rank(&self) -> u8 {
        match self {
            Value::Int(_) | Value::Float(_) => 0,
            Value::Date(_) => 1,
            Value::Str(_) => 2,
        }
    }

    /// Renders the value the way it appears inside an error message.
    pub fn quoted(&self) -> String {
        match self {
            Value::Str(s) => format!("'{s}'"),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => float_cmp(*a, *b),
            (Value::Int(a), Value::Float(b)) => int_float_cmp(*a, *b),
            (Value::Float(a), Value::Int(b)) => int_float_cmp(*b, *a).reverse(),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Int(v) => v.hash(state),
            Value::Float(v) => match integral(*v) {
                Some(i) => i.hash(state),
                // -0.0 is integral, so only non-integral floats reach their bits.
                None => v.to_bits().hash(state),
            },
            Value::Date(v) => v.hash(state),
            Value::Str(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            // Debug keeps the fractional part so the text reloads as a float.
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Date(d) => write!(
                f,
                "{:04}-{:02}-{:02}",
                d.year(),
                u8::from(d.month()),
                d.day()
            ),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Date> for Value {
    fn from(value: Date) -> Self {
        Value::Date(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

/// Orders floats numerically, so `-0.0 == 0.0`; NaN falls back to the total order.
fn float_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}

/// Exact comparison of an integer with a float.
fn int_float_cmp(a: i64, b: f64) -> Ordering {
    match (a as f64).partial_cmp(&b) {
        // Rounding `a` may tie with `b`; an integral `b` then compares exactly.
        Some(Ordering::Equal) => i128::from(a).cmp(&(b as i128)),
        Some(ord) => ord,
        None => (a as f64).total_cmp(&b),
    }
}

/// The integer a float is equal to, when there is one.
fn integral(v: f64) -> Option<i64> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (v.fract() == 0.0 && (-LIMIT..LIMIT).contains(&v)).then_some(v as i64)
}

fn parse_int(raw: &str) -> Option<i64> {
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn parse_float(raw: &str) -> Option<f64> {
    let numeric = raw
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'));
    if !numeric || !raw.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Parses `YYYY-MM-DD`; `/` and `\` are accepted as separators too.
pub(crate) fn parse_date(raw: &str) -> Option<Date> {
    let sep = ['-', '/', '\\'].into_iter().find(|c| raw.contains(*c))?;
    let mut parts = raw.split(sep);
    let (year, month, day) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !(all_digits(year) && all_digits(month) && all_digits(day)) {
        return None;
    }
    let month = Month::try_from(month.parse::<u8>().ok()?).ok()?;
    Date::from_calendar_date(year.parse().ok()?, month, day.parse().ok()?).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn integer_column() {
        assert_eq!(ValueType::infer(["1", "2", "3"]), ValueType::Int);
        assert_eq!(Value::cast("-7", ValueType::Int), Value::Int(-7));
    }

    #[test]
    fn date_column() {
        assert_eq!(
            ValueType::infer(["2020-01-01", "2020-02-02"]),
            ValueType::Date
        );
        assert_eq!(
            Value::cast("2020/02/02", ValueType::Date),
            Value::Date(date!(2020 - 02 - 02))
        );
    }

    #[test]
    fn any_float_forces_float() {
        assert_eq!(ValueType::infer(["1", "2.5", "3"]), ValueType::Float);
        assert_eq!(Value::cast("1", ValueType::Float), Value::Float(1.0));
    }

    #[test]
    fn mixed_column_stays_string() {
        assert_eq!(ValueType::infer(["1", "x"]), ValueType::Str);
        assert_eq!(ValueType::infer(["1", "2020-01-01"]), ValueType::Str);
        assert_eq!(ValueType::infer(["inf", "nan"]), ValueType::Str);
    }

    #[test]
    fn invalid_calendar_dates_are_strings() {
        assert!(parse_date("2020-02-30").is_none());
        assert!(parse_date("2020-13-01").is_none());
        assert!(parse_date("2020-01").is_none());
    }

    #[test]
    fn float_display_reloads_as_float() {
        let text = Value::Float(3.0).to_string();
        assert_eq!(text, "3.0");
        assert_eq!(ValueType::infer([text.as_str()]), ValueType::Float);
    }

    #[test]
    fn ordering_groups_by_type() {
        let mut values = vec![
            Value::from("b"),
            Value::Date(date!(2020 - 01 - 01)),
            Value::from(2i64),
            Value::from(1.5),
            Value::from(1i64),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Value::Int(1),
                Value::Float(1.5),
                Value::Int(2),
                Value::Date(date!(2020 - 01 - 01)),
                Value::from("b")
            ]
        );
    }

    fn hash_of(value: &Value) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn ints_and_floats_compare_numerically() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::Float(-0.0), Value::Int(0));
        assert_eq!(Value::Float(0.0), Value::Float(-0.0));
        assert!(Value::Int(2) > Value::Float(1.5));
        assert!(Value::Float(-2.5) < Value::Int(-2));
        assert_ne!(Value::Int(i64::MAX), Value::Float(9_223_372_036_854_775_807.0));
        assert!(Value::Int((1 << 53) + 1) > Value::Float(9_007_199_254_740_992.0));
        assert_eq!(hash_of(&Value::Int(1)), hash_of(&Value::Float(1.0)));
        assert_eq!(hash_of(&Value::Int(0)), hash_of(&Value::Float(-0.0)));
    }
}
