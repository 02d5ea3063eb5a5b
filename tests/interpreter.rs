mod interpreter_tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use rlox as lox;

    use lox::interpreter::Interpreter;
    use lox::parser::Parser;
    use lox::resolver::Resolver;
    use lox::scanner::Scanner;
    use lox::token::Token;

    /// Runs the full pipeline over `source` with `print` output captured.
    /// Returns everything printed before the run ended, plus the runtime
    /// error message when the run aborted.
    fn run_capture(source: &str) -> (String, Option<String>) {
        let tokens: Vec<Token> = Scanner::new(source.as_bytes())
            .collect::<Result<_, _>>()
            .expect("test source must scan cleanly");

        let statements = Parser::new(tokens)
            .parse()
            .expect("test source must parse cleanly");

        let buffer: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::with_output(buffer.clone());

        Resolver::new(&mut interpreter)
            .resolve(&statements)
            .expect("test source must resolve cleanly");

        let error = interpreter.interpret(&statements).err().map(|e| {
            // Strip the trailing "[line N]" so assertions read naturally.
            e.to_string()
                .lines()
                .next()
                .unwrap_or_default()
                .to_string()
        });

        let output = String::from_utf8(buffer.borrow().clone()).expect("output is UTF-8");
        (output, error)
    }

    /// Shorthand for programs expected to run to completion.
    fn run(source: &str) -> String {
        let (output, error) = run_capture(source);
        assert_eq!(error, None, "program failed unexpectedly");
        output
    }

    /// Shorthand for programs expected to abort with a runtime error.
    fn run_err(source: &str) -> String {
        let (_, error) = run_capture(source);
        error.expect("expected a runtime error")
    }

    // ───────────────────────── arithmetic & printing ─────────────────────

    #[test]
    fn test_interp_01_precedence() {
        assert_eq!(run("print 1 + 2 * 3;"), "7\n");
    }

    #[test]
    fn test_interp_02_whole_numbers_print_without_decimals() {
        assert_eq!(run("print 3.0;"), "3\n");
        assert_eq!(run("print 3.5;"), "3.5\n");
        assert_eq!(run("print -0.0;"), "-0\n");
    }

    #[test]
    fn test_interp_03_string_concatenation() {
        assert_eq!(run("print \"foo\" + \"bar\";"), "foobar\n");
    }

    #[test]
    fn test_interp_04_mixed_plus_is_an_error() {
        let msg = run_err("print 1 + \"one\";");
        assert_eq!(msg, "Operands must be two numbers or two strings for '+'.");
    }

    #[test]
    fn test_interp_05_division_by_zero_is_an_error() {
        assert_eq!(run_err("print 1 / 0;"), "Division by zero.");
    }

    #[test]
    fn test_interp_06_unary_minus_requires_a_number() {
        assert_eq!(run_err("print -\"muffin\";"), "Operand must be a number for '-'.");
    }

    // ───────────────────────── truthiness & equality ─────────────────────

    /// Only nil and false are falsey; zero and the empty string are truthy.
    #[test]
    fn test_interp_07_truthiness() {
        assert_eq!(run("if (0) print \"yes\"; else print \"no\";"), "yes\n");
        assert_eq!(run("if (\"\") print \"yes\"; else print \"no\";"), "yes\n");
        assert_eq!(run("if (nil) print \"yes\"; else print \"no\";"), "no\n");
        assert_eq!(run("print !nil;"), "true\n");
    }

    #[test]
    fn test_interp_08_equality_never_crosses_kinds() {
        assert_eq!(run("print 1 == \"1\";"), "false\n");
        assert_eq!(run("print nil == nil;"), "true\n");
        assert_eq!(run("print nil == false;"), "false\n");
        assert_eq!(run("print \"a\" != \"b\";"), "true\n");
    }

    /// `and` / `or` return an operand, not a boolean, and never evaluate the
    /// right side when the left decides.
    #[test]
    fn test_interp_09_logical_operators_short_circuit() {
        assert_eq!(run("print \"hi\" or 2;"), "hi\n");
        assert_eq!(run("print nil or \"fallback\";"), "fallback\n");
        assert_eq!(run("print nil and 2;"), "nil\n");

        let source = "\
            var touched = false;\n\
            fun touch() { touched = true; return true; }\n\
            var r = false and touch();\n\
            print touched;\n";
        assert_eq!(run(source), "false\n");
    }

    // ───────────────────────── variables & scoping ───────────────────────

    #[test]
    fn test_interp_10_block_shadowing() {
        assert_eq!(run("var a = 1; { var a = 2; print a; } print a;"), "2\n1\n");
    }

    #[test]
    fn test_interp_11_reading_uninitialized_variable_is_an_error() {
        let msg = run_err("var a; print a;");
        assert_eq!(msg, "Variable 'a' has not been initialized.");
    }

    #[test]
    fn test_interp_12_assignment_cures_uninitialized() {
        assert_eq!(run("var a; a = 5; print a;"), "5\n");
    }

    #[test]
    fn test_interp_13_undefined_variable_is_an_error() {
        assert_eq!(run_err("print nowhere;"), "Undefined variable 'nowhere'.");
    }

    #[test]
    fn test_interp_14_assignment_is_an_expression() {
        assert_eq!(run("var a = 1; print a = 2;"), "2\n");
    }

    /// A closure binds to the scope where it was declared, even when a later
    /// declaration would shadow the name dynamically.
    #[test]
    fn test_interp_15_closure_binding_is_static() {
        let source = "\
            var a = \"global\";\n\
            {\n\
              fun show() { print a; }\n\
              show();\n\
              var a = \"block\";\n\
              show();\n\
            }\n";
        assert_eq!(run(source), "global\nglobal\n");
    }

    // ───────────────────────── control flow ──────────────────────────────

    #[test]
    fn test_interp_16_while_loop() {
        assert_eq!(run("var i = 0; while (i < 3) { print i; i = i + 1; }"), "0\n1\n2\n");
    }

    #[test]
    fn test_interp_17_for_loop() {
        assert_eq!(run("for (var i = 0; i < 3; i = i + 1) print i;"), "0\n1\n2\n");
    }

    #[test]
    fn test_interp_18_return_unwinds_out_of_a_loop() {
        let source = "\
            fun firstOver(limit) {\n\
              for (var i = 0; ; i = i + 1) {\n\
                if (i > limit) return i;\n\
              }\n\
            }\n\
            print firstOver(5);\n";
        assert_eq!(run(source), "6\n");
    }

    // ───────────────────────── functions & closures ──────────────────────

    #[test]
    fn test_interp_19_function_without_return_yields_nil() {
        assert_eq!(run("fun f() {} print f();"), "nil\n");
    }

    #[test]
    fn test_interp_20_recursion() {
        let source = "\
            fun fib(n) {\n\
              if (n < 2) return n;\n\
              return fib(n - 2) + fib(n - 1);\n\
            }\n\
            print fib(10);\n";
        assert_eq!(run(source), "55\n");
    }

    #[test]
    fn test_interp_21_closure_counter_keeps_state() {
        let source = "\
            fun makeCounter() {\n\
              var i = 0;\n\
              fun count() {\n\
                i = i + 1;\n\
                print i;\n\
              }\n\
              return count;\n\
            }\n\
            var counter = makeCounter();\n\
            counter();\n\
            counter();\n";
        assert_eq!(run(source), "1\n2\n");
    }

    /// Two closures over the same declaration share one captured variable.
    #[test]
    fn test_interp_22_sibling_closures_alias_their_capture() {
        let source = "\
            class Box {}\n\
            fun makePair() {\n\
              var n = 0;\n\
              fun inc() { n = n + 1; }\n\
              fun get() { return n; }\n\
              var pair = Box();\n\
              pair.inc = inc;\n\
              pair.get = get;\n\
              return pair;\n\
            }\n\
            var pair = makePair();\n\
            pair.inc();\n\
            pair.inc();\n\
            print pair.get();\n";
        assert_eq!(run(source), "2\n");
    }

    #[test]
    fn test_interp_23_arity_mismatch_names_both_counts() {
        let msg = run_err("fun f(a, b) {} f(1);");
        assert_eq!(msg, "Expected 2 arguments but got 1.");

        let msg = run_err("fun g() {} g(1, 2, 3);");
        assert_eq!(msg, "Expected 0 arguments but got 3.");
    }

    #[test]
    fn test_interp_24_calling_a_non_callable() {
        assert_eq!(run_err("\"toast\"();"), "Can only call functions and classes.");
        assert_eq!(run_err("nil();"), "Can only call functions and classes.");
    }

    #[test]
    fn test_interp_25_unbounded_recursion_is_caught() {
        assert_eq!(run_err("fun loop() { loop(); } loop();"), "Stack overflow.");
    }

    #[test]
    fn test_interp_26_native_clock_is_predefined() {
        assert_eq!(run("print clock() > 0;"), "true\n");
    }

    #[test]
    fn test_interp_27_function_values_print_by_name() {
        assert_eq!(run("fun f() {} print f;"), "<fn f>\n");
        assert_eq!(run("print clock;"), "<native fn clock>\n");
    }

    // ───────────────────────── classes & instances ───────────────────────

    #[test]
    fn test_interp_28_class_and_instance_display() {
        assert_eq!(run("class Foo {} print Foo;"), "Foo\n");
        assert_eq!(run("class Foo {} print Foo();"), "Foo instance\n");
    }

    #[test]
    fn test_interp_29_fields_are_per_instance() {
        let source = "\
            class Bag {}\n\
            var a = Bag();\n\
            var b = Bag();\n\
            a.item = \"apple\";\n\
            b.item = \"banana\";\n\
            print a.item;\n\
            print b.item;\n";
        assert_eq!(run(source), "apple\nbanana\n");
    }

    #[test]
    fn test_interp_30_initializer_binds_this() {
        let source = "\
            class Point {\n\
              init(x, y) {\n\
                this.x = x;\n\
                this.y = y;\n\
              }\n\
              sum() { return this.x + this.y; }\n\
            }\n\
            print Point(1, 2).sum();\n";
        assert_eq!(run(source), "3\n");
    }

    /// A constructor always yields the instance, even after a bare `return;`.
    #[test]
    fn test_interp_31_init_returns_this() {
        let source = "\
            class C {\n\
              init() { return; }\n\
            }\n\
            print C();\n";
        assert_eq!(run(source), "C instance\n");
    }

    #[test]
    fn test_interp_32_methods_bind_this_when_extracted() {
        let source = "\
            class Egotist {\n\
              speak() { print this.name; }\n\
            }\n\
            var e = Egotist();\n\
            e.name = \"me\";\n\
            var method = e.speak;\n\
            method();\n";
        assert_eq!(run(source), "me\n");
    }

    #[test]
    fn test_interp_33_fields_shadow_methods() {
        let source = "\
            class C {\n\
              greet() { return \"method\"; }\n\
            }\n\
            var c = C();\n\
            print c.greet();\n\
            c.greet = \"field\";\n\
            print c.greet;\n";
        assert_eq!(run(source), "method\nfield\n");
    }

    #[test]
    fn test_interp_34_undefined_property_is_an_error() {
        assert_eq!(run_err("class C {} C().missing;"), "Undefined property 'missing'.");
    }

    #[test]
    fn test_interp_35_property_access_on_non_instance() {
        assert_eq!(run_err("true.field;"), "Only instances have properties.");
        assert_eq!(run_err("123.field = 1;"), "Only instances have fields.");
    }

    // ───────────────────────── inheritance ───────────────────────────────

    #[test]
    fn test_interp_36_methods_are_inherited() {
        let source = "\
            class Doughnut {\n\
              cook() { print \"fry until golden\"; }\n\
            }\n\
            class Cruller < Doughnut {}\n\
            Cruller().cook();\n";
        assert_eq!(run(source), "fry until golden\n");
    }

    #[test]
    fn test_interp_37_subclass_methods_override() {
        let source = "\
            class A { who() { print \"A\"; } }\n\
            class B < A { who() { print \"B\"; } }\n\
            B().who();\n";
        assert_eq!(run(source), "B\n");
    }

    #[test]
    fn test_interp_38_method_lookup_walks_the_whole_chain() {
        let source = "\
            class A { who() { print \"A\"; } }\n\
            class B < A {}\n\
            class C < B {}\n\
            C().who();\n";
        assert_eq!(run(source), "A\n");
    }

    #[test]
    fn test_interp_39_inherited_initializer_runs() {
        let source = "\
            class Base {\n\
              init(x) { this.x = x; }\n\
            }\n\
            class Derived < Base {}\n\
            print Derived(42).x;\n";
        assert_eq!(run(source), "42\n");
    }

    #[test]
    fn test_interp_40_superclass_must_be_a_class() {
        assert_eq!(
            run_err("var NotAClass = \"so sad\"; class Sub < NotAClass {}"),
            "Superclass must be a class."
        );
    }

    // ───────────────────────── error recovery ────────────────────────────

    /// A runtime error aborts the rest of the program but output printed
    /// before the failure has already been flushed.
    #[test]
    fn test_interp_41_output_before_a_runtime_error_survives() {
        let (output, error) = run_capture("print \"first\"; print missing; print \"last\";");

        assert_eq!(output, "first\n");
        assert_eq!(error.as_deref(), Some("Undefined variable 'missing'."));
    }

    /// The interpreter stays usable after a runtime error (REPL behavior).
    #[test]
    fn test_interp_42_interpreter_survives_a_runtime_error() {
        let buffer: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::with_output(buffer.clone());

        let mut next_id = 0;
        let mut run_line = |interpreter: &mut Interpreter, source: &str| {
            let tokens: Vec<Token> = Scanner::new(source.as_bytes())
                .collect::<Result<_, _>>()
                .unwrap();

            let mut parser = Parser::resuming_from(tokens, next_id);
            let statements = parser.parse().unwrap();
            next_id = parser.next_node_id();

            Resolver::new(interpreter).resolve(&statements).unwrap();
            interpreter.interpret(&statements)
        };

        run_line(&mut interpreter, "var a = 1;").unwrap();
        assert!(run_line(&mut interpreter, "a + nil;").is_err());
        run_line(&mut interpreter, "print a + 1;").unwrap();

        assert_eq!(String::from_utf8(buffer.borrow().clone()).unwrap(), "2\n");
    }
}
