// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Run parameters and output multiplicity resolution

use serde::Serialize;

use super::SubPipe;

/// Live runs reach operator backends; dry runs synthesize everything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipeRunMode {
    #[default]
    Live,
    Dry,
}

/// Declared or requested output multiplicity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutputMultiplicity {
    /// `true`: a list of any length, `false`: a single value
    Flag(bool),
    /// A list of exactly this many items
    Count(usize),
}

/// Build a multiplicity from `nb_output` / `multiple_output`
///
/// A non-zero count takes precedence over the flag.
pub fn make_output_multiplicity(
    nb_output: Option<usize>,
    multiple_output: Option<bool>,
) -> Option<OutputMultiplicity> {
    match (nb_output, multiple_output) {
        (Some(n), _) if n > 0 => Some(OutputMultiplicity::Count(n)),
        (_, Some(flag)) => Some(OutputMultiplicity::Flag(flag)),
        _ => None,
    }
}

/// Outcome of applying a per-call override to a pipe's declared multiplicity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMultiplicity {
    pub resolved: Option<OutputMultiplicity>,
    pub enabled: bool,
    pub count: Option<usize>,
}

impl ResolvedMultiplicity {
    fn from_resolved(resolved: Option<OutputMultiplicity>) -> Self {
        match resolved {
            Some(OutputMultiplicity::Count(n)) => Self {
                resolved,
                enabled: true,
                count: Some(n),
            },
            Some(OutputMultiplicity::Flag(flag)) => Self {
                resolved,
                enabled: flag,
                count: None,
            },
            None => Self {
                resolved,
                enabled: false,
                count: None,
            },
        }
    }
}

/// Apply an override to a base multiplicity
///
/// `false` forces a single output, `true` keeps a base count or enables a
/// variable list, a count always wins, no override keeps the base.
pub fn output_multiplicity_to_apply(
    base: Option<OutputMultiplicity>,
    override_multiplicity: Option<OutputMultiplicity>,
) -> ResolvedMultiplicity {
    let resolved = match override_multiplicity {
        None => base,
        Some(OutputMultiplicity::Flag(false)) => Some(OutputMultiplicity::Flag(false)),
        Some(OutputMultiplicity::Flag(true)) => match base {
            Some(OutputMultiplicity::Count(n)) => Some(OutputMultiplicity::Count(n)),
            _ => Some(OutputMultiplicity::Flag(true)),
        },
        Some(OutputMultiplicity::Count(n)) => Some(OutputMultiplicity::Count(n)),
    };
    ResolvedMultiplicity::from_resolved(resolved)
}

/// Parameters of one pipe invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeRunParams {
    pub run_mode: PipeRunMode,

    /// Name the caller wants the output stored under
    pub output_name: Option<String>,

    /// Override of the pipe's declared output multiplicity
    pub output_multiplicity: Option<OutputMultiplicity>,

    /// In dry runs, synthesize inputs missing from memory
    pub mock_inputs: bool,

    /// Items per synthesized list
    pub nb_list_items: usize,
}

impl Default for PipeRunParams {
    fn default() -> Self {
        Self {
            run_mode: PipeRunMode::Live,
            output_name: None,
            output_multiplicity: None,
            mock_inputs: true,
            nb_list_items: 3,
        }
    }
}

impl PipeRunParams {
    pub fn live() -> Self {
        Self::default()
    }

    pub fn dry() -> Self {
        Self {
            run_mode: PipeRunMode::Dry,
            ..Self::default()
        }
    }

    pub fn with_output_name(mut self, name: &str) -> Self {
        self.output_name = Some(name.to_string());
        self
    }

    pub fn with_output_multiplicity(mut self, multiplicity: Option<OutputMultiplicity>) -> Self {
        self.output_multiplicity = multiplicity;
        self
    }

    pub fn with_mock_inputs(mut self, mock_inputs: bool) -> Self {
        self.mock_inputs = mock_inputs;
        self
    }

    pub fn with_nb_list_items(mut self, nb_list_items: usize) -> Self {
        self.nb_list_items = nb_list_items.max(1);
        self
    }

    pub fn is_dry(&self) -> bool {
        self.run_mode == PipeRunMode::Dry
    }

    /// Whether missing inputs may be synthesized
    pub fn may_mock_inputs(&self) -> bool {
        self.is_dry() && self.mock_inputs
    }

    /// Parameters for a sub-pipe call: same mode, the step's result name
    /// and multiplicity override
    pub fn for_sub_pipe(&self, sub_pipe: &SubPipe) -> Self {
        Self {
            output_name: Some(sub_pipe.result_name().to_string()),
            output_multiplicity: sub_pipe.output_multiplicity,
            ..self.clone()
        }
    }

    /// Parameters for an anonymous inner call (batch item, condition branch)
    pub fn for_inner_call(&self) -> Self {
        Self {
            output_name: None,
            output_multiplicity: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OutputMultiplicity::{Count, Flag};

    #[test]
    fn test_make_output_multiplicity() {
        assert_eq!(make_output_multiplicity(Some(3), Some(true)), Some(Count(3)));
        assert_eq!(make_output_multiplicity(Some(0), Some(true)), Some(Flag(true)));
        assert_eq!(make_output_multiplicity(None, Some(false)), Some(Flag(false)));
        assert_eq!(make_output_multiplicity(None, None), None);
    }

    #[test]
    fn test_no_override_keeps_base() {
        let r = output_multiplicity_to_apply(Some(Count(2)), None);
        assert_eq!(r.resolved, Some(Count(2)));
        assert!(r.enabled);
        assert_eq!(r.count, Some(2));

        let r = output_multiplicity_to_apply(Some(Flag(true)), None);
        assert!(r.enabled);
        assert_eq!(r.count, None);

        let r = output_multiplicity_to_apply(None, None);
        assert!(!r.enabled);
    }

    #[test]
    fn test_false_override_forces_single() {
        let r = output_multiplicity_to_apply(Some(Count(4)), Some(Flag(false)));
        assert_eq!(r.resolved, Some(Flag(false)));
        assert!(!r.enabled);
        assert_eq!(r.count, None);
    }

    #[test]
    fn test_true_override_keeps_base_count() {
        let r = output_multiplicity_to_apply(Some(Count(4)), Some(Flag(true)));
        assert_eq!(r.resolved, Some(Count(4)));
        assert_eq!(r.count, Some(4));

        let r = output_multiplicity_to_apply(None, Some(Flag(true)));
        assert_eq!(r.resolved, Some(Flag(true)));
        assert!(r.enabled);
    }

    #[test]
    fn test_count_override_wins() {
        let r = output_multiplicity_to_apply(Some(Count(4)), Some(Count(2)));
        assert_eq!(r.count, Some(2));
        let r = output_multiplicity_to_apply(Some(Flag(false)), Some(Count(2)));
        assert!(r.enabled);
    }

    #[test]
    fn test_sub_pipe_params() {
        let params = PipeRunParams::dry().with_output_name("outer");
        let sub = SubPipe::new("summarize", "summary").with_output_multiplicity(Some(Count(2)));

        let sub_params = params.for_sub_pipe(&sub);
        assert!(sub_params.is_dry());
        assert_eq!(sub_params.output_name.as_deref(), Some("summary"));
        assert_eq!(sub_params.output_multiplicity, Some(Count(2)));

        let inner = sub_params.for_inner_call();
        assert_eq!(inner.output_name, None);
        assert_eq!(inner.output_multiplicity, None);
    }
}
