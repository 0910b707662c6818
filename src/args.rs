//! Command-line argument assembly for wrapped tools.
//!
//! Wrapped CLIs (Helm, the AWS CLI, and friends) take long runs of optional
//! flags. [`CommandArgs`] turns optional configuration into an argv vector
//! without `if` ladders at every call site: disabled flags and absent options
//! are simply not emitted.

use std::fmt;

/// An argv vector under construction.
///
/// # Examples
///
/// ```
/// use regconfig::args::CommandArgs;
///
/// let args = CommandArgs::new("helm")
///     .args(["upgrade", "--install", "my-release", "oci://ghcr.io/acme/chart"])
///     .option("--namespace", Some("apps"))
///     .option("--version", None::<&str>)
///     .flag("--wait", true)
///     .flag("--atomic", false)
///     .repeated("--set", ["image.tag=1.2.3", "replicas=2"]);
///
/// assert_eq!(
///     args.to_string(),
///     "helm upgrade --install my-release oci://ghcr.io/acme/chart --namespace apps --wait --set image.tag=1.2.3 --set replicas=2",
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs {
    argv: Vec<String>,
}

impl CommandArgs {
    /// Start an argv vector with `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            argv: vec![program.into()],
        }
    }

    /// Append one positional argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    /// Append several positional arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append `name` when `enabled`.
    #[must_use]
    pub fn flag(self, name: &str, enabled: bool) -> Self {
        if enabled { self.arg(name) } else { self }
    }

    /// Append `name value` when `value` is present and non-empty.
    #[must_use]
    pub fn option<S: Into<String>>(self, name: &str, value: Option<S>) -> Self {
        match value.map(Into::into).filter(|v| !v.is_empty()) {
            Some(v) => self.arg(name).arg(v),
            None => self,
        }
    }

    /// Append `name value` once per value.
    #[must_use]
    pub fn repeated<I, S>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        values
            .into_iter()
            .fold(self, |args, value| args.arg(name).arg(value))
    }

    /// Return the assembled arguments.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.argv
    }

    /// Consume the builder and return the assembled arguments.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.argv
    }

    /// Return whether no argument has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }
}

impl fmt::Display for CommandArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv.join(" "))
    }
}

impl From<CommandArgs> for Vec<String> {
    fn from(args: CommandArgs) -> Self {
        args.into_vec()
    }
}
