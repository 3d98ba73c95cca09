use tracing::{debug, warn};

use crate::ast::Stmt;
use crate::builtins;
use crate::config::Config;
use crate::diagnostics::{Diagnostic, DiagnosticSink, Phase};
use crate::resolver::Locals;

pub mod callable;
pub mod environment;
pub mod error;
pub mod host;
mod operators;
pub mod output;
mod runtime;
pub mod value;

use environment::EnvRef;
pub use error::{RuntimeError, RuntimeErrorKind};
use host::HostExtensions;
use output::Output;
pub use runtime::ExecResult;
pub use value::Value;

/// Tree-walking evaluator. Globals and the binding-depth cache persist
/// across [`Interpreter::interpret`] calls, which is what the REPL relies on.
pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    locals: Locals,
    config: Config,
    output: Output,
    host: HostExtensions,
    call_depth: usize,
}

impl Interpreter {
    pub fn new(config: Config) -> Self {
        Self::with_output(config, Output::Stdout)
    }

    pub fn with_output(config: Config, output: Output) -> Self {
        let globals = EnvRef::global();
        builtins::install(&globals);
        let host = if config.allow_host {
            warn!("host extensions enabled");
            HostExtensions::with_builtin_commands()
        } else {
            HostExtensions::disabled()
        };
        Self {
            environment: globals.clone(),
            globals,
            locals: Locals::default(),
            config,
            output,
            host,
            call_depth: 0,
        }
    }

    /// Adds binding depths computed by the resolver. Earlier entries stay,
    /// since functions declared by previous runs still refer to them.
    pub fn resolve(&mut self, locals: Locals) {
        self.locals.extend(locals);
    }

    /// Executes top-level statements in order. The first runtime error is
    /// reported to `sink` and the remaining statements are skipped.
    pub fn interpret(&mut self, statements: &[Stmt], sink: &mut dyn DiagnosticSink) -> Result<(), RuntimeError> {
        debug!(statements = statements.len(), "interpreting");
        for statement in statements {
            if let Err(error) = self.execute(statement) {
                warn!(line = error.line(), %error, "runtime error");
                sink.report(Diagnostic::at_token(Phase::Runtime, &error.token, error.kind.to_string()));
                self.environment = self.globals.clone();
                self.call_depth = 0;
                return Err(error);
            }
        }
        Ok(())
    }

    pub fn call_depth(&self) -> usize {
        self.call_depth
    }

    /// Drains captured `print` output. Empty when printing to stdout.
    pub fn take_output(&mut self) -> String {
        self.output.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeIds;
    use crate::diagnostics::Diagnostics;
    use crate::lexer::tokenize;
    use crate::parser::parse_tokens;
    use crate::resolver::resolve;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    struct Run {
        output: String,
        result: Result<(), RuntimeError>,
        diagnostics: Diagnostics,
    }

    fn run_with(source: &str, config: Config) -> Run {
        let mut diagnostics = Diagnostics::new();
        let tokens = tokenize(source, &mut diagnostics).expect("tokenize");
        let statements = parse_tokens(tokens, &mut NodeIds::new(), &mut diagnostics).expect("parse");
        let mut interpreter = Interpreter::with_output(config, Output::buffer());
        if config.use_resolver {
            interpreter.resolve(resolve(&statements, &mut diagnostics).expect("resolve"));
        }
        let result = interpreter.interpret(&statements, &mut diagnostics);
        Run {
            output: interpreter.take_output(),
            result,
            diagnostics,
        }
    }

    fn run(source: &str) -> Run {
        run_with(source, Config::default())
    }

    fn output_of(source: &str) -> String {
        let run = run(source);
        if let Err(error) = run.result {
            panic!("unexpected runtime error: {error}");
        }
        run.output
    }

    fn error_of(source: &str) -> RuntimeError {
        run(source).result.expect_err("expected runtime error")
    }

    #[test]
    fn prints_integers_without_fraction() {
        assert_eq!(output_of("print 1 + 2;"), "3\n");
        assert_eq!(output_of("print 7 / 2;"), "3\n");
        assert_eq!(output_of("print 2.9;"), "2\n");
    }

    #[test]
    fn division_by_zero_reports_the_operator_line() {
        let run = run("print 1;\nprint 1 / 0;\nprint 2;");
        assert_eq!(run.output, "1\n");
        let error = run.result.expect_err("expected error");
        assert_eq!(error.kind, RuntimeErrorKind::DivisionByZero);
        assert_eq!(
            run.diagnostics.messages(),
            vec!["[line 2] Error at '/': Division by zero.".to_string()]
        );
    }

    #[test]
    fn string_plus_number_is_asymmetric() {
        assert_eq!(output_of("print \"x\" + 5;"), "x5\n");
        assert_eq!(
            error_of("print 5 + \"x\";").kind,
            RuntimeErrorKind::CannotAddStringToNumber
        );
    }

    #[test]
    fn block_shadowing_restores_outer_binding() {
        let source = indoc! {"
            var a = 1;
            {
                var a = 2;
                print a;
            }
            print a;
        "};
        assert_eq!(output_of(source), "2\n1\n");
    }

    #[test]
    fn arity_error_names_the_function() {
        let source = indoc! {"
            fun add(a, b) { return a + b; }
            add(1, 2, 3);
        "};
        let error = error_of(source);
        assert_eq!(error.to_string(), "add expected 2 arguments but received 3.");
        assert_eq!(error.line(), 2);
    }

    #[test]
    fn recursive_factorial() {
        let source = indoc! {"
            fun fact(n) { return n <= 1 ? 1 : n * fact(n - 1); }
            print fact(10);
        "};
        assert_eq!(output_of(source), "3628800\n");
    }

    #[test]
    fn equality_compares_values() {
        let source = indoc! {r#"
            print nil == nil;
            print 1 == 1;
            print "ab" + "c" == "a" + "bc";
            print 1 != 1;
            print nil == false;
        "#};
        assert_eq!(output_of(source), "true\ntrue\ntrue\nfalse\nfalse\n");
    }

    #[test]
    fn closures_capture_their_environment() {
        let source = indoc! {"
            fun makeCounter() {
                var count = 0;
                fun increment() {
                    count += 1;
                    return count;
                }
                return increment;
            }
            var counter = makeCounter();
            counter();
            print counter();
        "};
        assert_eq!(output_of(source), "2\n");
    }

    #[test]
    fn closures_bind_statically() {
        let source = indoc! {r#"
            var a = "global";
            {
                fun show() { print a; }
                show();
                var a = "block";
                show();
            }
        "#};
        assert_eq!(output_of(source), "global\nglobal\n");

        // Dynamic lookup sees the later block binding.
        let config = Config {
            use_resolver: false,
            ..Config::default()
        };
        assert_eq!(run_with(source, config).output, "global\nblock\n");
    }

    fn without_resolver() -> Config {
        Config {
            use_resolver: false,
            ..Config::default()
        }
    }

    #[test]
    fn closures_see_later_assignments_to_captured_frames() {
        let source = indoc! {"
            {
                var x = 1;
                fun get() { return x; }
                x = 2;
                print get();
            }
        "};
        assert_eq!(output_of(source), "2\n");
        assert_eq!(run_with(source, without_resolver()).output, "2\n");
    }

    #[test]
    fn loop_iterations_share_the_enclosing_frame() {
        let source = indoc! {"
            var first;
            for (var i = 0; i < 3; i += 1) {
                if (i == 0) {
                    fun get() { return i; }
                    first = get;
                }
            }
            print first();

            var seen = 0;
            var n = 0;
            while (n < 3) {
                seen += n;
                n += 1;
            }
            print seen;
        "};
        assert_eq!(output_of(source), "3\n3\n");
        assert_eq!(run_with(source, without_resolver()).output, "3\n3\n");
    }

    #[test]
    fn logical_operators_return_deciding_operand() {
        let source = indoc! {r#"
            print nil or "fallback";
            print 1 and 2;
            print false && missing;
            print 3 || missing;
        "#};
        assert_eq!(output_of(source), "fallback\n2\nfalse\n3\n");
    }

    #[test]
    fn ternary_evaluates_one_branch() {
        assert_eq!(output_of("print true ? 1 : missing;"), "1\n");
        assert_eq!(output_of("print nil ? missing : 2;"), "2\n");
    }

    #[test]
    fn loops_and_compound_assignment() {
        let source = indoc! {"
            var total = 0;
            for (var i = 0; i < 5; i += 1) {
                total += i;
            }
            print total;
            var n = 3;
            while (n > 0) n -= 1;
            print n;
        "};
        assert_eq!(output_of(source), "10\n0\n");
    }

    #[test]
    fn functions_print_and_return_nil_by_default() {
        let source = indoc! {"
            fun f() {}
            print f;
            print f();
            print clock;
        "};
        assert_eq!(output_of(source), "<fn f>\nnil\n<native fn clock>\n");
    }

    #[test]
    fn calling_a_non_function_fails() {
        let error = error_of("\"text\"();");
        assert_eq!(
            error.kind,
            RuntimeErrorKind::NotCallable { type_name: "string" }
        );
    }

    #[test]
    fn undefined_variable_fails() {
        let error = error_of("print missing;");
        assert_eq!(error.to_string(), "Undefined variable 'missing'.");
        let error = error_of("missing = 1;");
        assert_eq!(error.to_string(), "Undefined variable 'missing'.");
    }

    #[test]
    fn runaway_recursion_is_a_stack_overflow() {
        let config = Config {
            max_call_depth: 200,
            ..Config::default()
        };
        let run = run_with("fun f() { return f(); } f();", config);
        assert_eq!(
            run.result.expect_err("expected overflow").kind,
            RuntimeErrorKind::StackOverflow { limit: 200 }
        );
    }

    #[test]
    fn return_outside_function_without_resolver() {
        let config = Config {
            use_resolver: false,
            ..Config::default()
        };
        let run = run_with("print 1; return 2; print 3;", config);
        assert_eq!(run.output, "1\n");
        assert_eq!(
            run.result.expect_err("expected error").kind,
            RuntimeErrorKind::ReturnOutsideFunction
        );
    }

    #[test]
    fn natives_are_installed() {
        let source = indoc! {r#"
            print len("hello");
            print str(12) + "!";
            print clock() > 0;
        "#};
        assert_eq!(output_of(source), "5\n12!\ntrue\n");
    }

    #[test]
    fn host_escape_is_disabled_by_default() {
        let error = error_of("host(\"echo hi\");");
        assert_eq!(error.kind, RuntimeErrorKind::HostDisabled);
    }

    #[test]
    fn host_escape_runs_registered_commands() {
        let config = Config {
            allow_host: true,
            ..Config::default()
        };
        let run = run_with("print host(\"echo \" + \"hi\");", config);
        assert!(run.result.is_ok());
        assert_eq!(run.output, "hi\n");

        let run = run_with("host(\"ls\");", config);
        assert_eq!(
            run.result.expect_err("expected error").kind,
            RuntimeErrorKind::UnknownHostCommand {
                command: "ls".to_string()
            }
        );
    }

    #[test]
    fn state_survives_between_runs() {
        let mut ids = NodeIds::new();
        let mut diagnostics = Diagnostics::new();
        let mut interpreter = Interpreter::with_output(Config::default(), Output::buffer());
        for source in ["fun twice(x) { return x * 2; }", "var y = twice(4);", "print y;"] {
            let tokens = tokenize(source, &mut diagnostics).expect("tokenize");
            let statements = parse_tokens(tokens, &mut ids, &mut diagnostics).expect("parse");
            interpreter.resolve(resolve(&statements, &mut diagnostics).expect("resolve"));
            interpreter.interpret(&statements, &mut diagnostics).expect("interpret");
        }
        assert_eq!(interpreter.take_output(), "8\n");
    }
}
