//! export / readonly - Mark variables for the environment or as constant
//!
//! Usage:
//!   export              - List all exported variables
//!   export -p           - List all exported variables (same as no args)
//!   export NAME=value   - Set and export variable
//!   export NAME+=value  - Append value and export variable
//!   export NAME         - Export existing variable (or create it unset)
//!   export -n NAME      - Un-export variable
//!   readonly [-aA] NAME[=value]
//!   readonly [-p]       - List readonly variables
//!
//! Both are thin wrappers over the declare machinery.

use super::declare_cmd::{run_declare, Operand};
use crate::interpreter::runner::{ExecResult, Runner};

pub fn handle_export(runner: &mut Runner, args: &[String]) -> ExecResult {
    run_declare(runner, "export", args.iter().cloned().map(Operand::Text).collect())
}

pub fn handle_readonly(runner: &mut Runner, args: &[String]) -> ExecResult {
    run_declare(runner, "readonly", args.iter().cloned().map(Operand::Text).collect())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run;

    #[test]
    fn test_export_sets_and_marks() {
        assert_eq!(run("export A=1; declare -p A").1, "declare -x A=\"1\"\n");
        assert_eq!(run("B=2; export B; declare -p B").1, "declare -x B=\"2\"\n");
        assert_eq!(run("export C=x; export C+=y; echo $C").1, "xy\n");
    }

    #[test]
    fn test_export_n_removes_attribute() {
        assert_eq!(run("export A=1; export -n A; declare -p A").1, "declare -- A=\"1\"\n");
    }

    #[test]
    fn test_export_listing() {
        let (_, out, _) = run("export -p");
        assert!(out.contains("declare -x HOME=\"/home/tester\"\n"));
        assert!(out.contains("declare -x PATH=\"/usr/bin:/bin\"\n"));
        let (_, out, _) = run("plain=1; export");
        assert!(!out.contains("plain"));
    }

    #[test]
    fn test_exported_to_child_environment() {
        assert_eq!(run("export GREETING=hi; sh -c 'echo $GREETING'").1, "hi\n");
        assert_eq!(run("LOCAL=hi; sh -c 'echo \"[$LOCAL]\"'").1, "[]\n");
    }

    #[test]
    fn test_readonly() {
        let (_, out, err) = run("readonly R=1; R=2; echo $R; unset R; echo $?");
        assert_eq!(out, "1\n1\n");
        assert!(err.contains("R: readonly variable"));
        assert!(err.contains("R: cannot unset: readonly variable"));
        assert_eq!(run("readonly R=1; readonly -p | grep -c 'declare -r R'").1, "1\n");
    }

    #[test]
    fn test_readonly_array() {
        assert_eq!(run("readonly -a L=(a b); echo ${L[1]}").1, "b\n");
    }

    #[test]
    fn test_invalid_names() {
        let (_, out, err) = run("export 'a-b=1'; echo $?");
        assert_eq!(out, "1\n");
        assert!(err.contains("export: `a-b=1': not a valid identifier"));
    }
}
