mod resolver_tests {
    use rlox as lox;

    use lox::error::LoxError;
    use lox::interpreter::Interpreter;
    use lox::parser::Parser;
    use lox::resolver::Resolver;
    use lox::scanner::Scanner;
    use lox::token::Token;

    fn resolve(source: &str) -> Result<(), Vec<LoxError>> {
        let tokens: Vec<Token> = Scanner::new(source.as_bytes())
            .collect::<Result<_, _>>()
            .expect("test source must scan cleanly");

        let statements = Parser::new(tokens)
            .parse()
            .expect("test source must parse cleanly");

        let mut interpreter = Interpreter::new();
        Resolver::new(&mut interpreter).resolve(&statements)
    }

    fn resolve_err(source: &str) -> Vec<String> {
        resolve(source)
            .expect_err("expected resolution to fail")
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn test_resolver_01_clean_program_passes() {
        assert!(resolve("var a = 1; { var b = a; print b; }").is_ok());
    }

    #[test]
    fn test_resolver_02_self_referential_initializer() {
        let errors = resolve_err("{ var a = a; }");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Cannot read local variable in its own initializer"));
        assert!(errors[0].contains("at 'a'"));
    }

    /// Shadowing an outer variable in the initializer is fine at the global
    /// level: globals may be redefined freely.
    #[test]
    fn test_resolver_03_global_redeclaration_is_allowed() {
        assert!(resolve("var a = 1; var a = 2;").is_ok());
    }

    #[test]
    fn test_resolver_04_local_redeclaration_is_an_error() {
        let errors = resolve_err("{ var a = 1; var a = 2; }");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Variable already declared in this scope"));
    }

    #[test]
    fn test_resolver_05_top_level_return() {
        let errors = resolve_err("return 1;");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Cannot return from top-level code"));
    }

    #[test]
    fn test_resolver_06_return_inside_function_is_fine() {
        assert!(resolve("fun f() { return 1; }").is_ok());
    }

    #[test]
    fn test_resolver_07_this_outside_class() {
        let errors = resolve_err("print this;");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Cannot use 'this' outside of a class"));
    }

    /// `this` inside a plain function is still outside any class.
    #[test]
    fn test_resolver_08_this_inside_free_function() {
        let errors = resolve_err("fun f() { return this; }");

        assert!(errors[0].contains("Cannot use 'this' outside of a class"));
    }

    #[test]
    fn test_resolver_09_this_inside_method_is_fine() {
        assert!(resolve("class C { m() { return this; } }").is_ok());
    }

    #[test]
    fn test_resolver_10_class_inheriting_from_itself() {
        let errors = resolve_err("class Ouroboros < Ouroboros {}");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("A class cannot inherit from itself"));
    }

    #[test]
    fn test_resolver_11_returning_a_value_from_init() {
        let errors = resolve_err("class C { init() { return 1; } }");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Cannot return a value from an initializer"));
    }

    /// A bare `return;` in an initializer is legal (early exit).
    #[test]
    fn test_resolver_12_bare_return_from_init_is_fine() {
        assert!(resolve("class C { init() { return; } }").is_ok());
    }

    /// All static errors in one pass, not just the first.
    #[test]
    fn test_resolver_13_errors_accumulate() {
        let errors = resolve_err("return 1;\nprint this;\n{ var a = a; }");

        assert_eq!(errors.len(), 3);
    }

    /// A resolved local keeps its binding even when a later declaration in the
    /// same block would shadow it dynamically: the reference in the function
    /// body must keep pointing at the global.
    #[test]
    fn test_resolver_14_closure_binding_is_static() {
        let source = "\
            var a = \"global\";\n\
            {\n\
              fun show() { print a; }\n\
              show();\n\
              var a = \"block\";\n\
              show();\n\
            }\n";

        assert!(resolve(source).is_ok());
    }
}
