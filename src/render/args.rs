//! Binding spec arguments to a handler's parameter list
//!
//! Positionals fill parameters in declaration order, keywords bind by name.
//! `multi_cell_type_2d,CA3 Glut|Sst Gaba,region1=Gad1` binds `cell_types`
//! positionally and `region1` by keyword.

use panel_dsl::{KwArgs, LIST_SEPARATOR};
use std::collections::HashMap;

use crate::error::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub required: bool,
    pub default: Option<&'static str>,
}

impl Param {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
            default: None,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
            default: None,
        }
    }

    pub const fn with_default(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            required: false,
            default: Some(default),
        }
    }
}

/// Arguments after binding, defaults applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundArgs {
    values: HashMap<&'static str, String>,
}

impl BoundArgs {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn require(&self, name: &str) -> Result<&str, RenderError> {
        self.get(name)
            .ok_or_else(|| RenderError::MissingArgument(name.to_string()))
    }

    pub fn get_usize(&self, name: &str) -> Result<Option<usize>, RenderError> {
        self.get(name)
            .map(|v| {
                v.trim().parse().map_err(|_| RenderError::InvalidNumber {
                    param: name.to_string(),
                    value: v.to_string(),
                })
            })
            .transpose()
    }

    pub fn get_bool(&self, name: &str) -> Result<Option<bool>, RenderError> {
        self.get(name)
            .map(|v| match v.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(RenderError::InvalidChoice {
                    param: name.to_string(),
                    value: v.to_string(),
                    allowed: vec!["true".into(), "false".into()],
                }),
            })
            .transpose()
    }

    /// `|`-separated list; `None` when the argument is absent
    pub fn get_list(&self, name: &str) -> Option<Vec<String>> {
        self.get(name).map(split_list)
    }

    /// Value that must be one of `allowed`
    pub fn get_choice(
        &self,
        name: &str,
        allowed: &[&str],
    ) -> Result<Option<String>, RenderError> {
        match self.get(name) {
            None => Ok(None),
            Some(v) if allowed.contains(&v) => Ok(Some(v.to_string())),
            Some(v) => Err(RenderError::InvalidChoice {
                param: name.to_string(),
                value: v.to_string(),
                allowed: allowed.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }
}

pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn bind(params: &[Param], args: &[String], kwargs: &KwArgs) -> Result<BoundArgs, RenderError> {
    if args.len() > params.len() {
        return Err(RenderError::TooManyPositional {
            expected: params.len(),
            found: args.len(),
        });
    }

    let mut values: HashMap<&'static str, String> = params
        .iter()
        .zip(args)
        .map(|(p, v)| (p.name, v.clone()))
        .collect();

    for (key, value) in kwargs.iter() {
        let param = params
            .iter()
            .find(|p| p.name == key)
            .ok_or_else(|| RenderError::UnknownArgument(key.to_string()))?;
        if values.insert(param.name, value.to_string()).is_some() {
            return Err(RenderError::DuplicateArgument(key.to_string()));
        }
    }

    for param in params {
        if values.contains_key(param.name) {
            continue;
        }
        match (param.required, param.default) {
            (true, _) => return Err(RenderError::MissingArgument(param.name.to_string())),
            (false, Some(default)) => {
                values.insert(param.name, default.to_string());
            }
            (false, None) => {}
        }
    }

    Ok(BoundArgs { values })
}
