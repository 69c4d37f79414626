//! # Utility Functions Module
//!
//! This module provides the helpers used to build argument vectors for
//! external tools. Commands are never assembled as shell strings: every path
//! travels as its own argument.

/// Placeholder replaced by the input path(s) of a tool invocation.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Placeholder replaced by the output path of a tool invocation.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Builds a `Vec<String>` argument list.
///
/// Every item goes through `ToString`, so items may have different types.
///
/// # Example
/// ```rust
/// use photo_packager::args;
///
/// let level = 9;
/// let args = args!["-r", format!("-{}", level), "{output}", "{input}"];
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        vec![$(::std::string::ToString::to_string(&$item)),*]
    };
}

/// Expands an argument template into a concrete argument vector.
///
/// - A fragment that is exactly `{input}` is replaced by every input, each as
///   a separate argument.
/// - Inside any other fragment `{output}` is substituted with `output`, and
///   `{input}` with the inputs joined by a space (only sensible for a single input).
pub fn expand_template(template: &[String], output: Option<&str>, inputs: &[String]) -> Vec<String> {
    let mut expanded = Vec::with_capacity(template.len() + inputs.len());

    for fragment in template {
        if fragment == INPUT_PLACEHOLDER {
            expanded.extend(inputs.iter().cloned());
            continue;
        }

        let mut arg = fragment.clone();
        if let Some(output) = output {
            arg = arg.replace(OUTPUT_PLACEHOLDER, output);
        }
        if arg.contains(INPUT_PLACEHOLDER) {
            arg = arg.replace(INPUT_PLACEHOLDER, &inputs.join(" "));
        }
        expanded.push(arg);
    }

    expanded
}

/// True when the template writes to a distinct output path
pub fn needs_output_path(template: &[String]) -> bool {
    template.iter().any(|fragment| fragment.contains(OUTPUT_PLACEHOLDER))
}
