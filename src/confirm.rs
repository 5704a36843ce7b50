//! Confirmation before registering a new shader type

use console::Term;

/// Answer to "create shader type X?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    /// Yes, and stop asking for the rest of this store's lifetime
    YesToAll,
    No,
}

impl Confirmation {
    /// Parse a typed answer: y/yes, a/all, n/no (case-insensitive).
    pub fn parse(answer: &str) -> Option<Self> {
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => Some(Confirmation::Yes),
            "a" | "all" | "yes to all" => Some(Confirmation::YesToAll),
            "n" | "no" => Some(Confirmation::No),
            _ => None,
        }
    }

    pub fn accepted(&self) -> bool {
        !matches!(self, Confirmation::No)
    }
}

/// Decides whether an unknown shader type may be created.
pub trait TypeConfirmer {
    fn confirm_create_type(&mut self, label: &str) -> Confirmation;
}

/// Whether the store still needs to ask before creating shader types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TypePolicy {
    #[default]
    Ask,
    /// Every unknown type is created without asking
    CreateAll,
}

impl TypePolicy {
    pub fn from_confirm_all(confirm_all: bool) -> Self {
        if confirm_all {
            TypePolicy::CreateAll
        } else {
            TypePolicy::Ask
        }
    }

    /// Resolve the answer for `label`, consulting `confirmer` only while asking.
    ///
    /// A `YesToAll` answer switches the policy to `CreateAll`.
    pub fn confirm(&mut self, label: &str, confirmer: &mut dyn TypeConfirmer) -> Confirmation {
        if *self == TypePolicy::CreateAll {
            return Confirmation::YesToAll;
        }
        let answer = confirmer.confirm_create_type(label);
        if answer == Confirmation::YesToAll {
            *self = TypePolicy::CreateAll;
        }
        answer
    }
}

/// Interactive prompt on the controlling terminal.
pub struct ConsolePrompt {
    term: Term,
}

impl ConsolePrompt {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

impl Default for ConsolePrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeConfirmer for ConsolePrompt {
    fn confirm_create_type(&mut self, label: &str) -> Confirmation {
        loop {
            let asked = self.term.write_line(&format!(
                "Shader type '{}' does not exist. Create it? [y]es / [a]ll / [N]o",
                label
            ));
            if asked.is_err() {
                return Confirmation::No;
            }
            match self.term.read_line() {
                // An empty answer (or no terminal at all) is a refusal.
                Ok(line) if line.trim().is_empty() => return Confirmation::No,
                Ok(line) => {
                    if let Some(answer) = Confirmation::parse(&line) {
                        return answer;
                    }
                }
                Err(_) => return Confirmation::No,
            }
        }
    }
}

/// Gives the same answer every time; for scripts and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub Confirmation);

impl TypeConfirmer for FixedAnswer {
    fn confirm_create_type(&mut self, _label: &str) -> Confirmation {
        self.0
    }
}
