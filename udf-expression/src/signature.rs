use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use udf_data::ScalarType;
use udf_errors::{internal_err, UdfError, UdfResult};

/// How the result of a function depends on things other than its arguments.
///
/// Mirrors the volatility categories of PostgreSQL's `CREATE FUNCTION`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Volatility {
    /// Always returns the same result given the same arguments
    Immutable,
    /// Returns the same result given the same arguments for every row of a single statement
    Stable,
}

/// One typed variant of a function.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    name: String,
    params: Vec<ScalarType>,
    /// If set, the last entry of `params` may be repeated any number of times (including zero)
    variadic: bool,
    return_type: ScalarType,
    volatility: Volatility,
    /// Wins ties between equally cheap signatures, which only happen when arguments are untyped
    /// NULLs
    preferred: bool,
}

/// Cost of passing an argument of one type to a parameter of another, or `None` if it can't be
/// passed at all
fn conversion_cost(arg: ScalarType, param: ScalarType) -> Option<u32> {
    if arg == param {
        Some(0)
    } else if arg == ScalarType::Null {
        Some(1)
    } else if arg.widens_to(param) {
        Some(2)
    } else {
        None
    }
}

impl FunctionSignature {
    pub fn new<N, P>(name: N, params: P, return_type: ScalarType) -> Self
    where
        N: Into<String>,
        P: IntoIterator<Item = ScalarType>,
    {
        Self {
            name: name.into().to_lowercase(),
            params: params.into_iter().collect(),
            variadic: false,
            return_type,
            volatility: Volatility::Immutable,
            preferred: false,
        }
    }

    /// Allow the last parameter to repeat
    pub fn variadic(mut self) -> Self {
        self.variadic = !self.params.is_empty();
        self
    }

    pub fn with_volatility(mut self, volatility: Volatility) -> Self {
        self.volatility = volatility;
        self
    }

    /// Pick this signature when a call matches several signatures equally well, as PostgreSQL
    /// does with its preferred type of each category
    pub fn preferred(mut self) -> Self {
        self.preferred = true;
        self
    }

    /// The canonical (lower-case) name of the function
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ScalarType] {
        &self.params
    }

    pub fn return_type(&self) -> ScalarType {
        self.return_type
    }

    pub fn volatility(&self) -> Volatility {
        self.volatility
    }

    pub fn accepts_arity(&self, n: usize) -> bool {
        if self.variadic {
            n + 1 >= self.params.len()
        } else {
            n == self.params.len()
        }
    }

    /// The declared type of the parameter at position `idx`, taking repetition of a variadic
    /// parameter into account
    pub fn param_type(&self, idx: usize) -> Option<ScalarType> {
        match self.params.get(idx) {
            Some(ty) => Some(*ty),
            None if self.variadic => self.params.last().copied(),
            None => None,
        }
    }

    /// Total cost of converting `args` to this signature's parameter types, or `None` if this
    /// signature does not accept them.
    pub fn cost(&self, args: &[ScalarType]) -> Option<u32> {
        if !self.accepts_arity(args.len()) {
            return None;
        }
        args.iter()
            .enumerate()
            .map(|(idx, arg)| conversion_cost(*arg, self.param_type(idx)?))
            .sum()
    }

    fn describe_arity(&self) -> String {
        if self.variadic {
            format!("at least {}", self.params.len().saturating_sub(1))
        } else {
            self.params.len().to_string()
        }
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.name, self.params.iter().join(", "))?;
        if self.variadic {
            f.write_str("...")?;
        }
        write!(f, ") -> {}", self.return_type)
    }
}

/// Table of every known function signature, keyed by lower-cased function name.
#[derive(Debug, Default, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, Vec<FunctionSignature>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a signature under its own name.
    ///
    /// Fails with [`UdfError::DuplicateSignature`] if a signature with exactly the same parameter
    /// types is already registered for that name, or if the signature is preferred and that name
    /// already has a preferred signature.
    pub fn register(&mut self, signature: FunctionSignature) -> UdfResult<()> {
        let name = signature.name.clone();
        self.insert(name, signature)
    }

    /// Make every signature of `target` callable as `alias` as well.
    pub fn register_alias(&mut self, alias: &str, target: &str) -> UdfResult<()> {
        let signatures = self
            .functions
            .get(&target.to_lowercase())
            .cloned()
            .ok_or_else(|| internal_err!("Can't alias unknown function {}", target))?;
        for signature in signatures {
            self.insert(alias.to_lowercase(), signature)?;
        }
        Ok(())
    }

    fn insert(&mut self, key: String, signature: FunctionSignature) -> UdfResult<()> {
        let existing = self.functions.entry(key.clone()).or_default();
        if existing.iter().any(|s| {
            (s.params == signature.params && s.variadic == signature.variadic)
                || (s.preferred && signature.preferred)
        }) {
            return Err(UdfError::DuplicateSignature {
                name: key,
                signature: signature.to_string(),
            });
        }
        existing.push(signature);
        Ok(())
    }

    /// All signatures callable by `name`, which is matched case-insensitively
    pub fn signatures(&self, name: &str) -> &[FunctionSignature] {
        self.functions
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Names of every registered function, in no particular order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Pick the signature of `name` that best matches a call with the given argument types.
    ///
    /// Every signature accepting the number of arguments is costed per argument: an exact type
    /// match costs nothing, an untyped NULL costs 1 and a numeric widening costs 2. The unique
    /// cheapest signature wins. If several are equally cheap, the preferred one among them wins.
    pub fn resolve(&self, name: &str, args: &[ScalarType]) -> UdfResult<&FunctionSignature> {
        let no_such_function = || UdfError::NoSuchFunction {
            name: name.to_owned(),
            args: args.iter().join(", "),
        };

        let candidates = self.signatures(name);
        if candidates.is_empty() {
            return Err(no_such_function());
        }
        if !candidates.iter().any(|s| s.accepts_arity(args.len())) {
            return Err(UdfError::ArityError {
                function: name.to_owned(),
                expected: candidates
                    .iter()
                    .map(FunctionSignature::describe_arity)
                    .unique()
                    .join(" or "),
                got: args.len(),
            });
        }

        let costed = candidates
            .iter()
            .filter_map(|s| Some((s.cost(args)?, s)))
            .min_set_by_key(|(cost, _)| *cost);
        let (cost, signature) = match costed.as_slice() {
            [] => return Err(no_such_function()),
            [only] => *only,
            tied => tied
                .iter()
                .copied()
                .filter(|(_, s)| s.preferred)
                .exactly_one()
                .map_err(|_| UdfError::AmbiguousFunction {
                    name: name.to_owned(),
                    args: args.iter().join(", "),
                })?,
        };
        trace!(%name, %signature, cost, "Resolved function call");
        Ok(signature)
    }

    /// The registry of every built-in function
    pub fn builtin() -> UdfResult<Self> {
        use ScalarType::*;

        let mut registry = Self::new();

        // Untyped NULLs resolve to text, like PostgreSQL's `unknown`
        let prefer = |signature: FunctionSignature, preferred: bool| {
            if preferred {
                signature.preferred()
            } else {
                signature
            }
        };

        for ty in [Bool, Int, BigInt, Double, Text, Date, Time, Timestamp] {
            registry.register(prefer(
                FunctionSignature::new("nvl", [ty, ty], ty),
                ty == Text,
            ))?;
            registry.register(prefer(
                FunctionSignature::new("nvl2", [ty, ty], ty).variadic(),
                ty == Text,
            ))?;
        }

        for ty in [Int, BigInt, Double, Text, Date, Time, Timestamp] {
            registry.register(prefer(
                FunctionSignature::new("greatest", [ty, ty], ty).variadic(),
                ty == Text,
            ))?;
        }

        registry.register(FunctionSignature::new("replace", [Text, Text, Text], Text))?;

        for params in [vec![], vec![Text], vec![Text, Int], vec![Text, BigInt]] {
            let preferred = params == [Text, BigInt];
            registry.register(prefer(
                FunctionSignature::new("sysdate", params, Text).with_volatility(Volatility::Stable),
                preferred,
            ))?;
        }
        registry.register_alias("curdate", "sysdate")?;

        for ty in [Date, Timestamp, Text] {
            registry.register(prefer(
                FunctionSignature::new("last_day", [ty], Date),
                ty == Date,
            ))?;
        }

        registry.register(FunctionSignature::new("pow", [Double, Double], Double))?;
        registry.register_alias("pow2", "pow")?;

        debug!(
            functions = registry.functions.len(),
            signatures = registry.functions.values().map(Vec::len).sum::<usize>(),
            "Built function registry"
        );
        Ok(registry)
    }
}

static BUILTINS: LazyLock<UdfResult<FunctionRegistry>> = LazyLock::new(FunctionRegistry::builtin);

/// The shared registry of built-in functions, built on first use
pub fn registry() -> UdfResult<&'static FunctionRegistry> {
    BUILTINS.as_ref().map_err(Clone::clone)
}
