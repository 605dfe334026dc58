use crate::regex::RegexInput;
use proc_macro::TokenStream;
use syn::parse_macro_input;

mod regex;

/// Compiles a pattern into a `tagex::Regex`, checking it at compile time.
///
/// Invalid patterns are reported as compiler errors on the pattern literal:
///
/// ```compile_fail
/// let regex = tagex::regex!("(unclosed");
/// ```
///
/// With the `dot` feature enabled, `#[graph = "path.dot"]` additionally writes the
/// deterministic automaton of the pattern to a graphviz file while compiling.
///
/// ```
/// let regex = tagex::regex!("a(?<digits>\\d+)");
/// let found = regex.find("xa42").unwrap();
/// assert_eq!((found.start, found.end), (1, 4));
/// ```
#[proc_macro]
pub fn regex(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as RegexInput);
    input.compile()
}
