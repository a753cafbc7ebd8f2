//! End-to-end script behaviour through the embedding API.

use tasksh::ast::print_script;
use tasksh::interpreter::{InputStream, OutputStream};
use tasksh::{ExecResult, Shell, ShellConfig, ShellError};
use tempfile::TempDir;

fn shell() -> Shell {
    Shell::new(ShellConfig::default().with_env([("PATH", "/usr/bin:/bin"), ("HOME", "/home/tester")]))
}

fn shell_in(dir: &TempDir) -> Shell {
    let mut config = ShellConfig::default().with_env([("PATH", "/usr/bin:/bin")]);
    config.cwd = Some(dir.path().to_path_buf());
    Shell::new(config)
}

async fn exec(src: &str) -> ExecResult {
    shell().exec(src).await.unwrap()
}

async fn stdout(src: &str) -> String {
    exec(src).await.stdout
}

#[tokio::test(flavor = "multi_thread")]
async fn test_single_quotes_are_literal() {
    assert_eq!(stdout("echo '$HOME $(echo x) $((1+1)) *'").await, "$HOME $(echo x) $((1+1)) *\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_arithmetic_precedence() {
    assert_eq!(stdout("echo $((2 + 3 * 4)) $((2 ** 3 ** 2)) $(( (1 + 2) * 3 ))").await, "14 512 9\n");
    assert_eq!(stdout("x=7; echo $((x % 4)) $((x > 3 ? 1 : 0)) $((-x))").await, "3 1 -7\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_division_by_zero_is_reported() {
    let result = exec("echo $((1 / 0)); echo after $?").await;
    assert!(result.stderr.contains("division by 0"));
    assert!(result.stdout.starts_with("after "));
    assert!(!result.stdout.contains("after 0"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_parameter_defaults() {
    assert_eq!(stdout("echo ${X:-bar}; echo ${X-unset}").await, "bar\nunset\n");
    assert_eq!(stdout("echo ${X:=bar}; echo $X").await, "bar\nbar\n");
    assert_eq!(stdout("X=1; echo ${X:+alt} ${Y:+alt}.").await, "alt .\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pattern_removal_and_replacement() {
    let script = "F=hello.tar.gz; echo ${F%.gz} ${F%%.*} ${F#*.} ${F##*.} ${F/l/L} ${F//l/L} ${#F}";
    assert_eq!(stdout(script).await, "hello.tar hello tar.gz gz heLlo.tar.gz heLLo.tar.gz 12\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_glob_visits_sorted_matches() {
    let dir = TempDir::new().unwrap();
    for name in ["b.txt", "a.txt", "c.log"] {
        std::fs::write(dir.path().join(name), "").unwrap();
    }
    let mut sh = shell_in(&dir);
    let result = sh.exec("for f in *.txt; do echo \"$f\"; done; echo *.md").await.unwrap();
    assert_eq!(result.stdout, "a.txt\nb.txt\n*.md\n");
    let result = sh.exec("shopt -s nullglob; echo start *.md end").await.unwrap();
    assert_eq!(result.stdout, "start end\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pipeline_stages_see_only_predecessor() {
    assert_eq!(stdout("printf 'b\\na\\n' | sort").await, "a\nb\n");
    assert_eq!(stdout("echo one | { read line; echo \"got $line\"; } | tr a-z A-Z").await, "GOT ONE\n");
}

#[test]
fn test_pipeline_ignores_script_stdin() {
    let mut sh = shell();
    let (out, buf) = OutputStream::buffer();
    sh.set_io(InputStream::bytes(b"script input\n".to_vec()), out, OutputStream::Null);
    sh.run_str("true | cat; echo '--'; cat | tr a-z A-Z").unwrap();
    let bytes = buf.lock().unwrap().clone();
    assert_eq!(String::from_utf8(bytes).unwrap(), "--\nSCRIPT INPUT\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pipeline_status() {
    assert_eq!(stdout("false | true; echo $? ${PIPESTATUS[@]}").await, "0 1 0\n");
    assert_eq!(stdout("set -o pipefail; false | true; echo $?").await, "1\n");
    assert_eq!(stdout("! true; echo $?").await, "1\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_functions_and_locals() {
    let script = r#"
x=global
greet() {
    local x=inner
    echo "hello $1 from $x"
    return 4
}
greet world
echo "status $? x=$x"
"#;
    assert_eq!(stdout(script).await, "hello world from inner\nstatus 4 x=global\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_case_terminators() {
    let script = r#"
for v in apple kiwi zzz; do
    case $v in
        a*) echo "a-word" ;&
        k*) echo "fell or k" ;;
        *) echo "other" ;;
    esac
done
"#;
    assert_eq!(stdout(script).await, "a-word\nfell or k\nfell or k\nother\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_loops_with_break_and_continue() {
    let script = r#"
for ((i = 0; i < 5; i++)); do
    [ $i -eq 1 ] && continue
    [ $i -eq 3 ] && break
    echo $i
done
n=0
until [ $n -ge 2 ]; do n=$((n + 1)); done
echo n=$n
"#;
    assert_eq!(stdout(script).await, "0\n2\nn=2\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_errexit_stops_script() {
    let result = exec("set -e; echo before; false; echo after").await;
    assert_eq!(result.stdout, "before\n");
    assert_eq!(result.exit_code, 1);
    // Conditions and && lists are exempt.
    assert_eq!(stdout("set -e; if false; then :; fi; false || true; echo ok").await, "ok\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_here_documents() {
    let script = "name=doc\ncat <<EOF\nhello $name\nEOF\ncat <<'EOF'\nraw $name\nEOF\n";
    assert_eq!(stdout(script).await, "hello doc\nraw $name\n");
    assert_eq!(stdout("cat <<< \"here $((1 + 1))\"").await, "here 2\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_substitution_is_isolated() {
    assert_eq!(stdout("x=1; y=$(x=2; echo $x); echo $x $y").await, "1 2\n");
    assert_eq!(stdout("x=1; (x=3; cd /); echo $x").await, "1\n");
    assert_eq!(stdout("echo \"$(printf 'a\\n\\n\\n')\"end").await, "aend\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_not_found_and_not_executable() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("script.sh"), "echo hi").unwrap();
    let mut sh = shell_in(&dir);
    let result = sh.exec("no_such_command_xyz; echo $?; ./script.sh; echo $?").await.unwrap();
    assert_eq!(result.stdout, "127\n126\n");
    assert!(result.stderr.contains("no_such_command_xyz: command not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_redirections_apply_in_order() {
    let dir = TempDir::new().unwrap();
    let mut sh = shell_in(&dir);
    let result = sh.exec("echo one > out.txt; echo two >> out.txt; { echo err >&2; } 2>&1 >/dev/null; cat out.txt").await.unwrap();
    assert_eq!(result.stdout, "err\none\ntwo\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_background_jobs_and_wait() {
    let script = "(sleep 0.05; echo bg) & echo fg; wait; echo done";
    assert_eq!(stdout(script).await, "fg\nbg\ndone\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_arrays() {
    let script = r#"a=(x y "z w"); a+=(v); echo ${#a[@]} ${a[2]}; for e in "${a[@]}"; do echo "[$e]"; done"#;
    assert_eq!(stdout(script).await, "4 z w\n[x]\n[y]\n[z w]\n[v]\n");
    assert_eq!(stdout("declare -A m; m[k]=v; echo ${m[k]} ${!m[@]}").await, "v k\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_conditional_command() {
    let script = r#"s=foo.rs; [[ $s == *.rs && -n $s ]] && echo rs; [[ abc123 =~ ^[a-z]+([0-9]+)$ ]] && echo ${BASH_REMATCH[1]}"#;
    assert_eq!(stdout(script).await, "rs\n123\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_nounset_error() {
    let result = exec("set -u; echo $MISSING; echo unreachable").await;
    assert!(result.stderr.contains("MISSING: unbound variable"));
    assert!(!result.stdout.contains("unreachable"));
    assert_ne!(result.exit_code, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_parse_error_runs_nothing() {
    let mut sh = shell();
    let err = sh.exec("echo first\nfi").await.unwrap_err();
    assert!(matches!(err, ShellError::Parse(_)));
}

#[test]
fn test_printer_round_trip() {
    let src = "f() { echo \"$1\" | tr a b; }\nfor x in a b; do case $x in a) f $x ;; *) echo no ;; esac; done\nif [[ -n $y ]]; then y=$((y + 1)); fi > out 2>&1";
    let once = print_script(&tasksh::parse(src, "round.sh").unwrap());
    let twice = print_script(&tasksh::parse(&once, "round.sh").unwrap());
    assert_eq!(once, twice);
}

#[test]
fn test_run_str_status() {
    let mut sh = shell();
    assert_eq!(sh.run_str("exit 7").unwrap(), 7);
    assert_eq!(sh.run_str("true").unwrap(), 0);
}
