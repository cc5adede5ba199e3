use std::cmp::{max, Ordering};
use std::fmt::{self, Display};
use std::io::prelude::*;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

use diesel::deserialize::{self, FromSql};
use diesel::pg::data_types::PgNumeric;
use diesel::pg::Pg;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Numeric;
use num::{self, BigInt, Integer, Signed, ToPrimitive, Zero};
use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::Value;

/// Exponents bigger than that in json input are treated as garbage
const MAX_EXPONENT: i64 = 1000;

/// Monetary amount of a coin, an arbitrary precision signed decimal.
///
/// It is stored as a big integer mantissa and a number of digits after the decimal point,
/// so `1.50` is `(150, 2)`. Equality and ordering compare values, i.e. `1.50 == 1.5`,
/// while `Display` keeps the original scale.
///
/// Floating point is never involved: json numbers are read from their exact textual form
/// (`serde_json` is built with `arbitrary_precision`), and postgres `numeric` is converted digit by digit.
/// Chain adapters convert to and from integer base units (satoshis, wei) with `to_base_units` / `from_base_units`.
#[derive(Clone, Debug, FromSqlRow, AsExpression)]
#[sql_type = "Numeric"]
pub struct Amount {
    mantissa: BigInt,
    scale: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Fail)]
#[fail(display = "invalid amount: {}", _0)]
pub struct ParseAmountError(String);

fn pow10(exp: u32) -> BigInt {
    num::pow(BigInt::from(10), exp as usize)
}

impl Amount {
    pub fn new<M: Into<BigInt>>(mantissa: M, scale: u32) -> Self {
        Amount {
            mantissa: mantissa.into(),
            scale,
        }
    }

    pub fn zero() -> Self {
        Amount::new(0, 0)
    }

    /// Amount from integer units of the smallest denomination, e.g. `from_base_units(150_000_000, 8) == 1.5`
    pub fn from_base_units<M: Into<BigInt>>(units: M, exponent: u32) -> Self {
        Amount::new(units, exponent)
    }

    /// Integer units of the smallest denomination, `None` if the amount has more
    /// fractional digits than the denomination allows.
    pub fn to_base_units(&self, exponent: u32) -> Option<BigInt> {
        if self.scale <= exponent {
            Some(self.mantissa_at(exponent))
        } else {
            let divisor = pow10(self.scale - exponent);
            let (units, rem) = self.mantissa.div_rem(&divisor);
            if rem.is_zero() {
                Some(units)
            } else {
                None
            }
        }
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.mantissa.is_positive()
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Same value with exactly `scale` digits after the point, `None` if that would drop nonzero digits.
    pub fn with_scale(&self, scale: u32) -> Option<Self> {
        if scale >= self.scale {
            Some(Amount::new(self.mantissa_at(scale), scale))
        } else {
            self.to_base_units(scale).map(|mantissa| Amount::new(mantissa, scale))
        }
    }

    /// Drops trailing fractional zeros, `1.500` -> `1.5`
    pub fn normalized(&self) -> Self {
        let ten = BigInt::from(10);
        let mut mantissa = self.mantissa.clone();
        let mut scale = self.scale;
        while scale > 0 {
            let (div, rem) = mantissa.div_rem(&ten);
            if !rem.is_zero() {
                break;
            }
            mantissa = div;
            scale -= 1;
        }
        Amount::new(mantissa, scale)
    }

    // scale must not be less than self.scale
    fn mantissa_at(&self, scale: u32) -> BigInt {
        &self.mantissa * pow10(scale - self.scale)
    }

    fn aligned(&self, other: &Amount) -> (BigInt, BigInt, u32) {
        let scale = max(self.scale, other.scale);
        (self.mantissa_at(scale), other.mantissa_at(scale), scale)
    }
}

impl Default for Amount {
    fn default() -> Self {
        Amount::zero()
    }
}

impl PartialEq for Amount {
    fn eq(&self, other: &Amount) -> bool {
        let (a, b, _) = self.aligned(other);
        a == b
    }
}

impl Eq for Amount {}

impl PartialOrd for Amount {
    fn partial_cmp(&self, other: &Amount) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Amount {
    fn cmp(&self, other: &Amount) -> Ordering {
        let (a, b, _) = self.aligned(other);
        a.cmp(&b)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, other: Amount) -> Amount {
        let (a, b, scale) = self.aligned(&other);
        Amount::new(a + b, scale)
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, other: Amount) -> Amount {
        let (a, b, scale) = self.aligned(&other);
        Amount::new(a - b, scale)
    }
}

/// Exact product, e.g. a coin amount priced with a fiat rate. Scales add up.
impl Mul for Amount {
    type Output = Amount;

    fn mul(self, other: Amount) -> Amount {
        Amount::new(self.mantissa * other.mantissa, self.scale + other.scale)
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount::new(-self.mantissa, self.scale)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sign = if self.mantissa.is_negative() { "-" } else { "" };
        let digits = self.mantissa.abs().to_string();
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }
        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits)
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    /// Accepts `-12.345`, `+1`, `.5`, `1e-8`, `2.5E3`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseAmountError(s.to_string());
        let (negative, unsigned) = if s.starts_with('-') {
            (true, &s[1..])
        } else if s.starts_with('+') {
            (false, &s[1..])
        } else {
            (false, s)
        };
        let (number, exponent) = match unsigned.find(|c| c == 'e' || c == 'E') {
            Some(pos) => {
                let exponent = unsigned[pos + 1..].parse::<i64>().map_err(|_| err())?;
                (&unsigned[..pos], exponent)
            }
            None => (unsigned, 0),
        };
        if exponent.abs() > MAX_EXPONENT {
            return Err(err());
        }
        let (int_part, frac_part) = match number.find('.') {
            Some(pos) => (&number[..pos], &number[pos + 1..]),
            None => (number, ""),
        };
        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part) {
            return Err(err());
        }
        let digits = format!("{}{}", int_part, frac_part);
        let mantissa = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(err)?;
        let mantissa = if negative { -mantissa } else { mantissa };
        let scale = frac_part.len() as i64 - exponent;
        if scale >= 0 {
            Ok(Amount::new(mantissa, scale as u32))
        } else {
            Ok(Amount::new(mantissa * pow10((-scale) as u32), 0))
        }
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = match Value::deserialize(deserializer)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => return Err(de::Error::custom(format!("expected amount as string or number, got {}", other))),
        };
        raw.parse().map_err(de::Error::custom)
    }
}

impl<'a> From<&'a Amount> for PgNumeric {
    fn from(amount: &'a Amount) -> Self {
        amount_to_pg_numeric(amount)
    }
}

impl From<Amount> for PgNumeric {
    fn from(amount: Amount) -> Self {
        (&amount).into()
    }
}

impl ToSql<Numeric, Pg> for Amount {
    fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
        let numeric = PgNumeric::from(self);
        ToSql::<Numeric, Pg>::to_sql(&numeric, out)
    }
}

impl FromSql<Numeric, Pg> for Amount {
    fn from_sql(numeric: Option<&[u8]>) -> deserialize::Result<Self> {
        let numeric = PgNumeric::from_sql(numeric)?;
        pg_numeric_to_amount(&numeric)
    }
}

// Iterator over the digits of a nonnegative big int in base 10k.
// The digits will be returned in little endian order.
struct ToBase10000(Option<BigInt>);

impl Iterator for ToBase10000 {
    type Item = i16;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.take().map(|v| {
            let (div, rem) = v.div_rem(&BigInt::from(10_000));
            if !div.is_zero() {
                self.0 = Some(div);
            }
            rem.to_i16().unwrap_or(0)
        })
    }
}

// to check binary posgres numeric representation
// psql -U postgres -d wallet_core -c 'COPY ( SELECT 10000.00001 ) TO STDOUT WITH ( FORMAT BINARY );' |   od --skip-bytes=25 -h --endian big
// bytes are: digits_count, weight, sign, scale, digit1, digit2, ..., last 2 bytes are trash

fn pg_numeric_to_amount(numeric: &PgNumeric) -> deserialize::Result<Amount> {
    let (negative, weight, scale, digits) = match *numeric {
        PgNumeric::Positive { weight, scale, ref digits } => (false, weight, scale, digits),
        PgNumeric::Negative { weight, scale, ref digits } => (true, weight, scale, digits),
        PgNumeric::NaN => return Err(Box::from(format!("NaN is not supported in Amount: {:#?}", numeric))),
    };

    let mut mantissa = BigInt::zero();
    for digit in digits {
        mantissa = mantissa * BigInt::from(10_000) + BigInt::from(*digit);
    }
    if negative {
        mantissa = -mantissa;
    }

    // decimal exponent of the least significant base 10k digit
    let exp = 4 * (i32::from(weight) - (digits.len() as i32) + 1);
    let amount = if exp >= 0 {
        Amount::new(mantissa * pow10(exp as u32), 0)
    } else {
        Amount::new(mantissa, (-exp) as u32)
    };
    Ok(amount.with_scale(u32::from(scale)).unwrap_or(amount))
}

fn amount_to_pg_numeric(amount: &Amount) -> PgNumeric {
    // pad fractional part so that the decimal point falls on a base 10k digit boundary
    let pad = (4 - amount.scale % 4) % 4;
    let frac_digits = ((amount.scale + pad) / 4) as i16;
    let aligned = amount.mantissa.abs() * pow10(pad);

    let mut digits = ToBase10000(Some(aligned)).collect::<Vec<_>>();
    let mut weight = digits.len() as i16 - 1 - frac_digits;
    while digits.last() == Some(&0) {
        digits.pop();
        weight -= 1;
    }
    let first_nonzero = digits.iter().position(|digit| *digit != 0).unwrap_or_else(|| digits.len());
    let mut digits: Vec<i16> = digits.split_off(first_nonzero);
    digits.reverse();
    if digits.is_empty() {
        weight = 0;
    }

    let scale = amount.scale as u16;
    if amount.is_negative() {
        PgNumeric::Negative { digits, scale, weight }
    } else {
        PgNumeric::Positive { digits, scale, weight }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json;

    // This thing converts binary postgres representation to PgNumeric
    // All test cases are generated using postgres command
    // psql -U postgres -d <your_db_name> -c 'COPY ( SELECT CAST (34534 AS NUMERIC) ) TO STDOUT WITH ( FORMAT BINARY );' |   od --skip-bytes=25 -h --endian big
    // bytes are: digits_count, weight, sign, scale, digit1, digit2, ..., last 2 bytes are trash and always equal ffff
    struct PgBinary(String);

    impl Into<PgNumeric> for PgBinary {
        fn into(self) -> PgNumeric {
            let bytes: Vec<i64> = self.0.split(" ").map(|x| i64::from_str_radix(x, 16).unwrap()).collect();
            let weight = bytes[1] as i16;
            let sign = bytes[2];
            let scale = bytes[3] as i16;
            let digits: Vec<i16> = bytes[4..].iter().map(|x| *x as i16).collect();

            match sign {
                0 => PgNumeric::Positive {
                    weight,
                    scale: scale as u16,
                    digits,
                },
                0x4000 => PgNumeric::Negative {
                    weight,
                    scale: scale as u16,
                    digits,
                },
                _ => PgNumeric::NaN,
            }
        }
    }

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn test_pg_numeric_happy_conversions() {
        let cases = [
            ("0003 0006 0000 0000 03e8 0000 03e8", "1000000010000000000000000000"),
            (
                "0009 0008 0000 0000 0003 1571 0005 0000 03e8 1103 1a94 0003 1296",
                "354890005000010004355680400034758",
            ),
            ("0000 0000 0000 0000", "0"),
            ("0000 0000 0000 0002", "0.00"),
            ("0001 0000 0000 0000 0001", "1"),
            ("0001 0000 0000 0000 270f", "9999"),
            ("0001 0001 0000 0000 0001", "10000"),
            ("0002 0001 0000 0000 0001 0457", "11111"),
            ("0003 0004 0000 0000 04d5 268f 095e", "12379871239800000000"),
            ("0001 0000 4000 0000 0001", "-1"),
            ("0001 0001 4000 0000 0001", "-10000"),
            ("0001 ffff 0000 0001 03e8", "0.1"),
            ("0001 fffe 0000 0005 03e8", "0.00001"),
            ("0002 0000 0000 0001 0001 03e8", "1.1"),
            ("0004 0001 0000 0005 0001 0000 0000 03e8", "10000.00001"),
            (
                "000b 0009 0000 0001 0154 0b07 1a24 03aa 121a 18c1 11ff 10dd 1aa5 05af 03e8",
                "340282366920938463463374607431768211455.1",
            ),
            (
                "000a 0009 4000 0000 00aa 0583 209a 01d5 090d 0c60 1c87 1bf6 20da 1661",
                "-170141183460469231731687303715884105729",
            ),
        ];
        for case in cases.into_iter() {
            let (binary, number) = case.clone();
            let binary: PgBinary = PgBinary(binary.to_string());
            let pg_num: PgNumeric = binary.into();
            let expected = amount(number);
            assert_eq!(pg_num, amount_to_pg_numeric(&expected), "Amount -> PgNumeric, case: {}", number);
            let parsed = pg_numeric_to_amount(&pg_num).unwrap();
            assert_eq!(parsed, expected, "PgNumeric -> Amount, case: {}", number);
            assert_eq!(parsed.to_string(), number, "scale is preserved, case: {}", number);
        }
    }

    #[test]
    fn test_pg_numeric_nan() {
        let pg_num: PgNumeric = PgBinary("0000 0000 C000 0000".to_string()).into();
        assert!(pg_numeric_to_amount(&pg_num).is_err());
    }

    #[test]
    fn test_serde_conversions() {
        let cases = [
            ("\"1000000010000000000000000000\"", Amount::new(1000000010000000000000000000u128, 0)),
            ("1000000010000000000000000000", Amount::new(1000000010000000000000000000u128, 0)),
            ("\"0.1\"", Amount::new(1, 1)),
            ("0.1", Amount::new(1, 1)),
            ("0.00010000", Amount::new(1, 4)),
            ("\"-12.345\"", Amount::new(-12345, 3)),
            ("1e-8", Amount::new(1, 8)),
            ("2.5E3", Amount::new(2500, 0)),
            ("\".5\"", Amount::new(5, 1)),
            ("\"+7\"", Amount::new(7, 0)),
        ];
        for case in cases.into_iter() {
            let (string, ref number) = *case;
            let parsed: Amount = serde_json::from_str(string).unwrap();
            assert_eq!(&parsed, number, "Case: {}", string);
        }
        assert_eq!(serde_json::to_string(&Amount::new(150, 2)).unwrap(), "\"1.50\"");
    }

    #[test]
    fn test_serde_error_conversions() {
        let error_cases = ["\"\"", "\"-\"", "\".\"", "\"1.2.3\"", "\"abc\"", "\"1e\"", "\"1e100000\"", "true", "null", "[1]"];
        for case in error_cases.into_iter() {
            let parsed: Result<Amount, _> = serde_json::from_str(case);
            assert_eq!(parsed.is_err(), true, "Case: {}", case);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Amount::new(-5, 3).to_string(), "-0.005");
        assert_eq!(Amount::new(150, 2).to_string(), "1.50");
        assert_eq!(Amount::new(150, 0).to_string(), "150");
        assert_eq!(Amount::new(1, 18).to_string(), "0.000000000000000001");
        assert_eq!(Amount::new(1500, 3).normalized().to_string(), "1.5");
    }

    #[test]
    fn test_base_units() {
        assert_eq!(Amount::from_base_units(150_000_000, 8), amount("1.5"));
        assert_eq!(amount("1.5").to_base_units(8), Some(BigInt::from(150_000_000)));
        assert_eq!(amount("0.000000001").to_base_units(8), None);
        assert_eq!(amount("0.000000010").to_base_units(8), Some(BigInt::from(1)));
        assert_eq!(
            amount("2.000000000000000001").to_base_units(18),
            Some(BigInt::parse_bytes(b"2000000000000000001", 10).unwrap())
        );
        assert_eq!(Amount::from_base_units(1, 18).to_base_units(8), None);
    }

    #[test]
    fn test_arithmetics_and_ordering() {
        assert_eq!(amount("0.1") + amount("0.2"), amount("0.3"));
        assert_eq!(amount("1") - amount("1.5"), amount("-0.5"));
        assert_eq!(-amount("2.50"), amount("-2.5"));
        assert_eq!(amount("1.10"), amount("1.1"));
        assert!(amount("2") > amount("1.99999"));
        assert!(amount("-0.001") < Amount::zero());
        assert!(amount("0.000").is_zero());
        assert!(amount("-3").is_negative());
        assert!(amount("0.01").is_positive());
        assert_eq!(amount("1.5") * amount("6301.12"), amount("9451.68"));
    }
}
