use crate::GeneratorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Ordinal of the push that produced the value. The byte offset is only known at the
    /// use site, relative to the current stack depth.
    Slot(usize),
    /// Position in the caller's argument list, addressed from the frame base.
    Param(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub location: Location,
}

/// Live variables in declaration order plus the index each open scope started at.
#[derive(Debug, Default)]
pub struct Variables {
    vars: Vec<Variable>,
    scopes: Vec<usize>,
}

impl Variables {
    pub fn begin_scope(&mut self) {
        self.scopes.push(self.vars.len());
    }

    /// Forgets everything declared since the matching [`Variables::begin_scope`] and returns
    /// how many stack slots those variables occupied.
    pub fn end_scope(&mut self) -> usize {
        let start = self
            .scopes
            .pop()
            .expect("end_scope called without a matching begin_scope");

        let slots = self.vars[start..]
            .iter()
            .filter(|var| matches!(var.location, Location::Slot(_)))
            .count();
        self.vars.truncate(start);

        slots
    }

    fn current_scope(&self) -> &[Variable] {
        &self.vars[self.scopes.last().copied().unwrap_or(0)..]
    }

    /// Only the innermost scope is checked, outer declarations may be shadowed.
    pub fn declare(&mut self, name: &str, location: Location) -> Result<(), GeneratorError> {
        if self.current_scope().iter().any(|var| var.name == name) {
            return Err(GeneratorError::DuplicateDeclaration(name.to_owned()));
        }

        self.vars.push(Variable {
            name: name.to_owned(),
            location,
        });
        Ok(())
    }

    /// Innermost declaration wins.
    pub fn lookup(&self, name: &str) -> Result<&Variable, GeneratorError> {
        self.vars
            .iter()
            .rev()
            .find(|var| var.name == name)
            .ok_or_else(|| GeneratorError::UndeclaredIdentifier(name.to_owned()))
    }
}
