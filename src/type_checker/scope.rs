use std::collections::{BTreeMap, HashMap};

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::types::{FunctionInfo, VariableInfo};

pub const GLOBAL_SCOPE: &str = "global";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Lambda,
}

#[derive(Debug)]
pub struct Scope {
    pub name: String,
    pub kind: ScopeKind,
    pub variables: HashMap<String, VariableInfo>,
    pub functions: HashMap<String, FunctionInfo>,
}

impl Scope {
    pub fn new(kind: ScopeKind, name: &str) -> Self {
        Scope {
            name: name.to_string(),
            kind,
            variables: HashMap::new(),
            functions: HashMap::new(),
        }
    }
}

/// Where a name was found relative to the scope doing the lookup.
#[derive(Debug)]
pub enum Resolution<'a> {
    /// Declared in the innermost scope.
    Local(&'a VariableInfo),
    /// Declared in the global scope.
    Global(&'a VariableInfo),
    /// Declared in an enclosing function or lambda.
    Captured(&'a VariableInfo),
}

impl<'a> Resolution<'a> {
    pub fn info(&self) -> &'a VariableInfo {
        match self {
            Resolution::Local(info) | Resolution::Global(info) | Resolution::Captured(info) => info,
        }
    }
}

/// The scopes active during the walk, plus every scope already exited.
#[derive(Debug)]
pub struct ScopeStack {
    active: Vec<Scope>,
    finished: Vec<Scope>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack {
            active: vec![Scope::new(ScopeKind::Global, GLOBAL_SCOPE)],
            finished: vec![],
        }
    }

    pub fn enter_scope(&mut self, kind: ScopeKind, name: &str) {
        self.active.push(Scope::new(kind, name));
    }

    /// Leaves the innermost scope. The global scope is never exited.
    pub fn exit_scope(&mut self) {
        if self.active.len() > 1 {
            if let Some(scope) = self.active.pop() {
                self.finished.push(scope);
            }
        }
    }

    pub fn current(&self) -> &Scope {
        &self.active[self.active.len() - 1]
    }

    fn current_mut(&mut self) -> &mut Scope {
        let last = self.active.len() - 1;
        &mut self.active[last]
    }

    pub fn declare_variable(&mut self, info: VariableInfo, position: Position) -> Result<(), Error> {
        let scope = self.current_mut();
        if scope.variables.contains_key(&info.name) || scope.functions.contains_key(&info.name) {
            return Err(Error::new(
                ErrorImpl::VariableAlreadyDeclared {
                    variable: info.name,
                },
                position,
            ));
        }

        scope.variables.insert(info.name.clone(), info);
        Ok(())
    }

    /// Functions always live in the global scope.
    pub fn declare_function(&mut self, info: FunctionInfo, position: Position) -> Result<(), Error> {
        let global = &mut self.active[0];
        if global.functions.contains_key(&info.name) || global.variables.contains_key(&info.name) {
            return Err(Error::new(
                ErrorImpl::FunctionAlreadyDeclared {
                    function: info.name,
                },
                position,
            ));
        }

        global.functions.insert(info.name.clone(), info);
        Ok(())
    }

    /// Searches from the innermost scope outwards.
    pub fn lookup_variable(&self, name: &str) -> Option<Resolution<'_>> {
        let innermost = self.active.len() - 1;

        for (depth, scope) in self.active.iter().enumerate().rev() {
            if let Some(info) = scope.variables.get(name) {
                return Some(if depth == innermost {
                    Resolution::Local(info)
                } else if scope.kind == ScopeKind::Global {
                    Resolution::Global(info)
                } else {
                    Resolution::Captured(info)
                });
            }
        }

        None
    }

    /// Mutable access to a variable visible from the innermost scope without
    /// crossing a function or lambda boundary other than into the globals.
    pub fn lookup_variable_mut(&mut self, name: &str) -> Option<&mut VariableInfo> {
        let innermost = self.active.len() - 1;
        if self.active[innermost].variables.contains_key(name) {
            return self.active[innermost].variables.get_mut(name);
        }

        self.active[0].variables.get_mut(name)
    }

    pub fn lookup_function(&self, name: &str) -> Option<&FunctionInfo> {
        self.active[0].functions.get(name)
    }

    pub fn lookup_function_mut(&mut self, name: &str) -> Option<&mut FunctionInfo> {
        self.active[0].functions.get_mut(name)
    }

    /// Builds the flattened table from every scope seen during the walk.
    pub fn flatten(self) -> SymbolTable {
        let mut table = SymbolTable::default();

        for scope in self.active.into_iter().chain(self.finished) {
            for (name, info) in scope.variables {
                let key = if scope.kind == ScopeKind::Global {
                    name
                } else {
                    SymbolTable::qualified(&scope.name, &name)
                };
                table.variables.insert(key, info);
            }

            table.functions.extend(scope.functions);
        }

        table
    }
}

/// Every symbol of a compilation unit, keyed deterministically.
///
/// Globals are keyed by their bare name; parameters and locals by
/// `owner::name`, where the owner is a function name or `lambda#<n>`.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    pub variables: BTreeMap<String, VariableInfo>,
    pub functions: BTreeMap<String, FunctionInfo>,
}

impl SymbolTable {
    pub fn qualified(owner: &str, name: &str) -> String {
        format!("{}::{}", owner, name)
    }

    pub fn local(&self, owner: &str, name: &str) -> Option<&VariableInfo> {
        self.variables.get(&SymbolTable::qualified(owner, name))
    }

    pub fn global(&self, name: &str) -> Option<&VariableInfo> {
        self.variables
            .get(name)
            .filter(|info| info.scope == GLOBAL_SCOPE)
    }

    /// Resolves `name` the way the body of `owner` sees it.
    pub fn resolve(&self, owner: Option<&str>, name: &str) -> Option<&VariableInfo> {
        owner
            .and_then(|owner| self.local(owner, name))
            .or_else(|| self.global(name))
    }

    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.get(name)
    }

    pub fn globals(&self) -> impl Iterator<Item = &VariableInfo> {
        self.variables
            .values()
            .filter(|info| info.scope == GLOBAL_SCOPE)
    }
}
