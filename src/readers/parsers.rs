//! nom parsers for the EBSD scan and points files
//!
//! Everything here works on a single, already trimmed line and knows nothing
//! about the meaning of the values. Interpretation of header keys lives with
//! the file readers.

// internal modules
use crate::point::{NodeId, Point};

// external crates
use nom::branch::alt;
use nom::bytes::complete::{tag, take_till1};
use nom::character::complete::{char, space0, space1};
use nom::combinator::{all_consuming, map, map_res, rest};
use nom::multi::separated_list1;
use nom::number::complete::double;
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated, tuple};
use nom::IResult;

/// Any line starting with `#`
pub fn is_comment(line: &str) -> bool {
    line.starts_with('#')
}

/// `# key: value` header entries, both sides trimmed
///
/// ```rust
/// # use ebsd::readers::parsers::header_entry;
/// let (_, (key, value)) = header_entry("# X_Dim: 32").unwrap();
/// assert_eq!((key, value), ("X_Dim", "32"));
/// ```
pub fn header_entry(i: &str) -> IResult<&str, (&str, &str)> {
    map(
        preceded(
            pair(char('#'), space0),
            separated_pair(take_till1(|c: char| c == ':'), char(':'), rest),
        ),
        |(key, value): (&str, &str)| (key.trim(), value.trim()),
    )(i)
}

/// Number following a fixed key prefix, e.g. `Phase_2` or `Symmetry_1`
pub fn indexed_key<'a>(prefix: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, usize> {
    all_consuming(preceded(tag(prefix), map_res(nom::character::complete::u32, usize::try_from)))
}

/// Column number of a `Column <n>` header key
pub fn column_number(i: &str) -> IResult<&str, usize> {
    all_consuming(preceded(
        pair(tag("Column"), space1),
        map_res(nom::character::complete::u32, usize::try_from),
    ))(i)
}

/// Whitespace separated list of numbers making up a whole line
pub fn number_list(i: &str) -> IResult<&str, Vec<f64>> {
    all_consuming(delimited(space0, separated_list1(space1, double), space0))(i)
}

fn coordinates(i: &str) -> IResult<&str, Point> {
    map(
        tuple((double, preceded(space1, double), preceded(space1, double))),
        |(x, y, z)| Point::new(x, y, z),
    )(i)
}

/// Points file line of `x y z` or `id x y z`
///
/// ```rust
/// # use ebsd::readers::parsers::point_line;
/// # use ebsd::point::Point;
/// let (_, (id, p)) = point_line("17 1.0 2.0 3e-1").unwrap();
/// assert_eq!(id, Some(17));
/// assert_eq!(p, Point::new(1.0, 2.0, 0.3));
/// ```
pub fn point_line(i: &str) -> IResult<&str, (Option<NodeId>, Point)> {
    all_consuming(delimited(
        space0,
        alt((
            map(
                pair(terminated(nom::character::complete::u64, space1), coordinates),
                |(id, p)| (Some(id), p),
            ),
            map(coordinates, |p| (None, p)),
        )),
        space0,
    ))(i)
}
