//! Canonical genomic intervals used as join keys between VEP records, CGI
//! alterations and CIViC queries.
//!
//! Indels are stored without their VCF anchor base: an insertion has an empty
//! reference and a deletion an empty alternate allele.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reference genome of a coordinate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum, Serialize, Deserialize,
)]
pub enum GenomeBuild {
    #[default]
    #[value(name = "GRCh37")]
    GRCh37,
    #[value(name = "GRCh38")]
    GRCh38,
    #[value(name = "NCBI36")]
    NCBI36,
}

impl fmt::Display for GenomeBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenomeBuild::GRCh37 => "GRCh37",
            GenomeBuild::GRCh38 => "GRCh38",
            GenomeBuild::NCBI36 => "NCBI36",
        };
        f.write_str(name)
    }
}

/// Chromosome label with any leading alphabetic prefix removed, so `chr1`,
/// `Chr1` and `1` compare equal.
///
/// Numbered chromosomes sort numerically, followed by `X`, `Y`, `M` and then
/// any other contig name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Chromosome {
    Numbered(u32),
    X,
    Y,
    M,
    Other(String),
}

impl Chromosome {
    fn known(label: &str) -> Option<Self> {
        if let Ok(number) = label.parse::<u32>() {
            return Some(Chromosome::Numbered(number));
        }
        match label.to_ascii_uppercase().as_str() {
            "X" => Some(Chromosome::X),
            "Y" => Some(Chromosome::Y),
            "M" | "MT" => Some(Chromosome::M),
            _ => None,
        }
    }

    pub fn parse(label: &str) -> Self {
        let label = label.trim();

        // shortest alphabetic prefix that leaves a known chromosome
        let known = Self::known(label).or_else(|| {
            label
                .char_indices()
                .take_while(|(_, c)| c.is_ascii_alphabetic())
                .find_map(|(idx, c)| Self::known(&label[idx + c.len_utf8()..]))
        });
        if let Some(chromosome) = known {
            return chromosome;
        }

        let contig = match label.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &label[3..],
            _ => label,
        };
        Chromosome::Other(contig.to_string())
    }
}

impl FromStr for Chromosome {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Chromosome::parse(s))
    }
}

impl From<String> for Chromosome {
    fn from(value: String) -> Self {
        Chromosome::parse(&value)
    }
}

impl From<Chromosome> for String {
    fn from(chrom: Chromosome) -> Self {
        chrom.to_string()
    }
}

impl fmt::Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chromosome::Numbered(n) => write!(f, "{}", n),
            Chromosome::X => f.write_str("X"),
            Chromosome::Y => f.write_str("Y"),
            Chromosome::M => f.write_str("M"),
            Chromosome::Other(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenomicCoordinate {
    pub chromosome: Chromosome,
    pub start: u64,
    pub stop: u64,
    #[serde(rename = "ref", default)]
    pub reference: String,
    #[serde(rename = "alt", default)]
    pub alternate: String,
    #[serde(default)]
    pub build: GenomeBuild,
}

/// Build-independent part of a coordinate used for joins.
pub type LocusKey = (Chromosome, u64, u64, String, String);

impl GenomicCoordinate {
    pub fn locus_key(&self) -> LocusKey {
        (
            self.chromosome.clone(),
            self.start,
            self.stop,
            self.reference.clone(),
            self.alternate.clone(),
        )
    }

    pub fn same_locus(&self, other: &GenomicCoordinate) -> bool {
        self.chromosome == other.chromosome
            && self.start == other.start
            && self.stop == other.stop
            && self.reference == other.reference
            && self.alternate == other.alternate
    }

    pub fn is_insertion(&self) -> bool {
        self.reference.is_empty() && !self.alternate.is_empty()
    }

    pub fn is_deletion(&self) -> bool {
        self.alternate.is_empty() && !self.reference.is_empty()
    }
}

impl fmt::Display for GenomicCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{} {}>{}",
            self.chromosome, self.start, self.stop, self.reference, self.alternate
        )
    }
}

/// Convert a VCF-style `(chrom, pos, ref, alt)` into a canonical coordinate.
pub fn normalize(
    chrom: &str,
    pos: u64,
    reference: &str,
    alternate: &str,
    build: GenomeBuild,
) -> GenomicCoordinate {
    let chromosome = Chromosome::parse(chrom);

    if reference.len() < alternate.len() {
        // insertion, drop the anchor base
        GenomicCoordinate {
            chromosome,
            start: pos + 1,
            stop: pos + 2,
            reference: String::new(),
            alternate: alternate.get(1..).unwrap_or_default().to_string(),
            build,
        }
    } else if reference.len() > alternate.len() && alternate.len() == 1 {
        // deletion, drop the anchor base
        GenomicCoordinate {
            chromosome,
            start: pos + 1,
            stop: pos + reference.len() as u64 - 1,
            reference: reference.get(1..).unwrap_or_default().to_string(),
            alternate: String::new(),
            build,
        }
    } else {
        GenomicCoordinate {
            chromosome,
            start: pos + 1,
            stop: pos + reference.len().max(1) as u64,
            reference: reference.to_string(),
            alternate: alternate.to_string(),
            build,
        }
    }
}

/// Parse a CGI `Mutation` string into the canonical coordinate form.
///
/// Accepted shapes: `chr7:140453136 A>T`, `chr1:1235-1238 TTCA>-` and
/// `chr1:1234-1234 ->GG`. CGI deletions start at the first deleted base,
/// insertions at the VCF anchor base.
pub fn parse_mutation(notation: &str, build: GenomeBuild) -> Option<GenomicCoordinate> {
    let (chrom, rest) = notation.trim().split_once(':')?;
    let (range, alleles) = rest.trim().split_once(' ')?;
    let (reference, alternate) = alleles.trim().split_once('>')?;

    let start: u64 = match range.split_once('-') {
        Some((start, _)) => start.trim().parse().ok()?,
        None => range.trim().parse().ok()?,
    };

    let reference = if reference == "-" { "" } else { reference };
    let alternate = if alternate == "-" { "" } else { alternate };

    if reference.is_empty() && alternate.is_empty() {
        return None;
    }

    let chromosome = Chromosome::parse(chrom);

    let coordinate = if reference.is_empty() {
        GenomicCoordinate {
            chromosome,
            start: start + 1,
            stop: start + 2,
            reference: String::new(),
            alternate: alternate.to_string(),
            build,
        }
    } else if alternate.is_empty() {
        GenomicCoordinate {
            chromosome,
            start,
            stop: start + reference.len() as u64 - 1,
            reference: reference.to_string(),
            alternate: String::new(),
            build,
        }
    } else {
        normalize(chrom, start, reference, alternate, build)
    };

    Some(coordinate)
}
