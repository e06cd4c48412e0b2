//! Spec-line parser
//!
//! The grammar is a flat comma/equals micro-language:
//!
//! ```text
//! line    := field ("," field)*
//! field   := positional | key "=" value
//! ```
//!
//! The first two positionals name the dataset and plot type. Everything else
//! passes through verbatim as `args` / `kwargs`.

use nom::{
    branch::alt,
    bytes::complete::take_while,
    character::complete::char,
    combinator::{all_consuming, map},
    multi::separated_list0,
    sequence::separated_pair,
    IResult,
};

use crate::ast::{DatasetName, KwArgs, PanelSpec, PlotType};
use crate::error::ParseError;

// ============================================================================
// Public API
// ============================================================================

/// Parse one spec line into a [`PanelSpec`]
pub fn parse_spec_line(line: &str) -> Result<PanelSpec, ParseError> {
    let normalized = normalize_line(line);
    if normalized.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut positional: Vec<String> = Vec::new();
    let mut kwargs = KwArgs::new();

    for raw in split_fields(&normalized)? {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        match classify_field(raw)? {
            Field::Positional(value) => positional.push(value.trim().to_string()),
            Field::Keyword(key, value) => {
                let key = key.trim();
                if key.is_empty() {
                    return Err(ParseError::EmptyKey {
                        field: raw.to_string(),
                    });
                }
                kwargs.insert(key, value.trim());
            }
        }
    }

    if positional.len() < 2 {
        return Err(ParseError::MissingPositional {
            found: positional.len(),
        });
    }

    let mut positional = positional.into_iter();
    let dataset: DatasetName = positional.next().unwrap_or_default().parse()?;
    let plot_type: PlotType = positional.next().unwrap_or_default().parse()?;

    PanelSpec::new(dataset, plot_type, positional.collect(), kwargs)
}

/// Strip boundary whitespace, `?` and `,`, and decode escaped spaces
///
/// A literal `%20` inside a value therefore reads as a space.
pub fn normalize_line(line: &str) -> String {
    trim_boundaries(&line.replace("%20", " ")).to_string()
}

/// Strip boundary whitespace, `?` and `,` only
pub fn trim_boundaries(line: &str) -> &str {
    line.trim_matches(|c: char| c.is_whitespace() || c == '?' || c == ',')
}

// ============================================================================
// Internal Parsers
// ============================================================================

fn field(input: &str) -> IResult<&str, &str> {
    take_while(|c| c != ',')(input)
}

fn fields(input: &str) -> IResult<&str, Vec<&str>> {
    separated_list0(char(','), field)(input)
}

fn split_fields(input: &str) -> Result<Vec<&str>, ParseError> {
    match all_consuming(fields)(input) {
        Ok((_, parts)) => Ok(parts),
        Err(e) => Err(ParseError::Syntax(e.to_string())),
    }
}

/// One comma-separated field
#[derive(Debug, PartialEq)]
enum Field<'a> {
    Positional(&'a str),
    Keyword(&'a str, &'a str),
}

fn not_equals(input: &str) -> IResult<&str, &str> {
    take_while(|c| c != '=')(input)
}

fn keyword(input: &str) -> IResult<&str, Field<'_>> {
    map(separated_pair(not_equals, char('='), not_equals), |(k, v)| {
        Field::Keyword(k, v)
    })(input)
}

fn positional(input: &str) -> IResult<&str, Field<'_>> {
    map(not_equals, Field::Positional)(input)
}

fn classify_field(input: &str) -> Result<Field<'_>, ParseError> {
    match alt((all_consuming(keyword), all_consuming(positional)))(input) {
        Ok((_, field)) => Ok(field),
        // Neither branch consumes a second '='
        Err(_) => Err(ParseError::AmbiguousField {
            field: input.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_positional_and_keyword_fields() {
        let spec =
            parse_spec_line("cemba_cell,continuous_scatter,l1_tsne,color=gene_mch:Gad1").unwrap();

        assert_eq!(spec.dataset, DatasetName::CembaCell);
        assert_eq!(spec.plot_type, PlotType::ContinuousScatter);
        assert_eq!(spec.args, vec!["l1_tsne".to_string()]);
        assert_eq!(spec.kwargs.get("color"), Some("gene_mch:Gad1"));
        assert_eq!(spec.kwargs.len(), 1);
    }

    #[test]
    fn test_normalization_trims_boundaries_and_spaces() {
        let spec = parse_spec_line(
            "  ?higlass, multi_cell_type_2d ,cell_types=CA3%20Glut|Sst%20Gaba, region1=Gad1,?\n",
        )
        .unwrap();

        assert_eq!(spec.dataset, DatasetName::Higlass);
        assert_eq!(spec.plot_type, PlotType::MultiCellType2d);
        assert_eq!(spec.kwargs.get("cell_types"), Some("CA3 Glut|Sst Gaba"));
        assert_eq!(spec.kwargs.get("region1"), Some("Gad1"));
    }

    #[test]
    fn test_keyword_order_does_not_matter_for_positionals() {
        let spec = parse_spec_line("cemba_cell,color=CellClass,categorical_scatter,l1_umap").unwrap();
        assert_eq!(spec.plot_type, PlotType::CategoricalScatter);
        assert_eq!(spec.args, vec!["l1_umap".to_string()]);
        assert_eq!(
            spec.to_spec_string(),
            "cemba_cell,categorical_scatter,l1_umap,color=CellClass"
        );
    }

    #[test]
    fn test_double_equals_is_rejected() {
        let err = parse_spec_line("cemba_cell,continuous_scatter,color=a=b").unwrap_err();
        assert_eq!(
            err,
            ParseError::AmbiguousField {
                field: "color=a=b".into()
            }
        );
    }

    #[test]
    fn test_too_few_positionals() {
        assert_eq!(
            parse_spec_line("cemba_cell").unwrap_err(),
            ParseError::MissingPositional { found: 1 }
        );
        assert_eq!(
            parse_spec_line("cemba_cell,color=CellClass").unwrap_err(),
            ParseError::MissingPositional { found: 1 }
        );
        assert_eq!(parse_spec_line(" ?, ").unwrap_err(), ParseError::Empty);
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!(
            parse_spec_line("mouse,continuous_scatter").unwrap_err(),
            ParseError::UnknownDataset("mouse".into())
        );
        assert_eq!(
            parse_spec_line("cemba_cell,violin").unwrap_err(),
            ParseError::UnknownPlotType("violin".into())
        );
        assert!(matches!(
            parse_spec_line("higlass,continuous_scatter").unwrap_err(),
            ParseError::PlotTypeNotInDataset { .. }
        ));
    }

    #[test]
    fn test_empty_key_and_empty_fields() {
        assert!(matches!(
            parse_spec_line("cemba_cell,continuous_scatter,=x").unwrap_err(),
            ParseError::EmptyKey { .. }
        ));
        let spec = parse_spec_line("cemba_cell,,continuous_scatter,,l1_tsne").unwrap();
        assert_eq!(spec.args, vec!["l1_tsne".to_string()]);
    }

    #[test]
    fn test_classify_field() {
        assert_eq!(classify_field("l1_tsne").unwrap(), Field::Positional("l1_tsne"));
        assert_eq!(
            classify_field("color=gene_mch:Gad1").unwrap(),
            Field::Keyword("color", "gene_mch:Gad1")
        );
        assert_eq!(classify_field("color=").unwrap(), Field::Keyword("color", ""));
        assert_eq!(
            classify_field("a==b").unwrap_err(),
            ParseError::AmbiguousField { field: "a==b".into() }
        );
    }

    proptest! {
        #[test]
        fn prop_any_field_with_two_equals_fails(
            key in "[a-z]{1,6}",
            mid in "[a-z0-9]{0,4}",
            tail in "[a-z0-9=]{0,4}",
        ) {
            let line = format!("cemba_cell,continuous_scatter,{}={}={}", key, mid, tail);
            let is_ambiguous = matches!(
                parse_spec_line(&line),
                Err(ParseError::AmbiguousField { .. })
            );
            prop_assert!(is_ambiguous);
        }

        #[test]
        fn prop_single_field_fails(field in "[a-z_]{1,12}") {
            prop_assert!(parse_spec_line(&field).is_err());
        }

        #[test]
        fn prop_fields_split_into_args_and_kwargs(
            args in prop::collection::vec("[a-z][a-z0-9_]{0,8}", 0..4),
            kwargs in prop::collection::vec(("[a-z][a-z_]{0,6}", "[A-Za-z0-9:]{1,8}"), 0..4),
        ) {
            let mut fields = vec!["cemba_cell".to_string(), "categorical_scatter".to_string()];
            fields.extend(args.iter().cloned());
            fields.extend(kwargs.iter().map(|(k, v)| format!("{}={}", k, v)));
            let spec = parse_spec_line(&fields.join(",")).unwrap();

            prop_assert_eq!(&spec.args, &args);
            let expected: KwArgs = kwargs.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            prop_assert_eq!(spec.kwargs, expected);
        }
    }
}
