mod parser_tests {
    use rlox as lox;

    use lox::ast::{Expr, Stmt};
    use lox::ast_printer::AstPrinter;
    use lox::error::LoxError;
    use lox::parser::Parser;
    use lox::scanner::Scanner;
    use lox::token::Token;

    fn parse(source: &str) -> Result<Vec<Stmt>, Vec<LoxError>> {
        let tokens: Vec<Token> = Scanner::new(source.as_bytes())
            .collect::<Result<_, _>>()
            .expect("test source must scan cleanly");

        Parser::new(tokens).parse()
    }

    /// Parse a single expression statement and render its tree in prefix form.
    fn parse_expr(source: &str) -> String {
        let statements = parse(source).expect("test source must parse cleanly");

        assert_eq!(statements.len(), 1);

        match &statements[0] {
            Stmt::Expression(expr) => AstPrinter::print(expr),
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parser_01_multiplication_binds_tighter_than_addition() {
        assert_eq!(parse_expr("1 + 2 * 3;"), "(+ 1.0 (* 2.0 3.0))");
    }

    #[test]
    fn test_parser_02_grouping_overrides_precedence() {
        assert_eq!(parse_expr("(1 + 2) * 3;"), "(* (group (+ 1.0 2.0)) 3.0)");
    }

    #[test]
    fn test_parser_03_binary_operators_are_left_associative() {
        assert_eq!(parse_expr("1 - 2 - 3;"), "(- (- 1.0 2.0) 3.0)");
        assert_eq!(parse_expr("8 / 4 / 2;"), "(/ (/ 8.0 4.0) 2.0)");
    }

    #[test]
    fn test_parser_04_comparison_binds_tighter_than_equality() {
        assert_eq!(parse_expr("1 < 2 == true;"), "(== (< 1.0 2.0) true)");
    }

    #[test]
    fn test_parser_05_unary_is_right_associative() {
        assert_eq!(parse_expr("!!false;"), "(! (! false))");
        assert_eq!(parse_expr("--1;"), "(- (- 1.0))");
    }

    #[test]
    fn test_parser_06_logical_or_is_lower_than_and() {
        assert_eq!(
            parse_expr("a or b and c;"),
            "(or a (and b c))",
        );
    }

    #[test]
    fn test_parser_07_assignment_is_right_associative() {
        assert_eq!(parse_expr("a = b = 1;"), "(= a (= b 1.0))");
    }

    #[test]
    fn test_parser_08_property_access_and_calls_chain() {
        assert_eq!(
            parse_expr("obj.field.method(1, 2);"),
            "(call (. (. obj field) method) 1.0 2.0)",
        );
    }

    #[test]
    fn test_parser_09_property_assignment_becomes_set() {
        assert_eq!(parse_expr("obj.x = 1;"), "(.= obj x 1.0)");
    }

    /// `for` never reaches later stages as its own node: it parses to an
    /// outer block holding the initializer and a `while` whose body appends
    /// the increment.
    #[test]
    fn test_parser_10_for_loop_desugars_to_while() {
        let statements = parse("for (var i = 0; i < 3; i = i + 1) print i;").unwrap();

        assert_eq!(statements.len(), 1);

        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected wrapping block, got {:?}", statements[0]);
        };

        assert_eq!(outer.len(), 2);
        assert!(matches!(&outer[0], Stmt::Var { name, .. } if name.lexeme == "i"));

        let Stmt::While { body, .. } = &outer[1] else {
            panic!("expected while loop, got {:?}", outer[1]);
        };

        let Stmt::Block(inner) = body.as_ref() else {
            panic!("expected loop body block, got {:?}", body);
        };

        assert_eq!(inner.len(), 2);
        assert!(matches!(&inner[0], Stmt::Print(_)));
        assert!(matches!(&inner[1], Stmt::Expression(Expr::Assign { .. })));
    }

    /// A `for` with all clauses omitted becomes a bare `while (true)`.
    #[test]
    fn test_parser_11_empty_for_clauses() {
        let statements = parse("for (;;) print 1;").unwrap();

        assert_eq!(statements.len(), 1);
        assert!(matches!(&statements[0], Stmt::While { .. }));
    }

    #[test]
    fn test_parser_12_class_with_superclass_and_methods() {
        let statements = parse("class Cruller < Doughnut { cook() { return 1; } }").unwrap();

        let Stmt::Class {
            name,
            superclass,
            methods,
        } = &statements[0]
        else {
            panic!("expected class declaration, got {:?}", statements[0]);
        };

        assert_eq!(name.lexeme, "Cruller");
        assert!(
            matches!(superclass, Some(Expr::Variable { name, .. }) if name.lexeme == "Doughnut")
        );
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].name.lexeme, "cook");
    }

    #[test]
    fn test_parser_13_variable_occurrences_get_distinct_ids() {
        let statements = parse("a + a;").unwrap();

        let Stmt::Expression(Expr::Binary { left, right, .. }) = &statements[0] else {
            panic!("expected binary expression, got {:?}", statements[0]);
        };

        let (Expr::Variable { id: left_id, .. }, Expr::Variable { id: right_id, .. }) =
            (left.as_ref(), right.as_ref())
        else {
            panic!("expected variable operands");
        };

        assert_ne!(left_id, right_id);
    }

    #[test]
    fn test_parser_14_resumed_parser_continues_the_id_sequence() {
        let scan = |source: &str| -> Vec<Token> {
            Scanner::new(source.as_bytes())
                .collect::<Result<_, _>>()
                .unwrap()
        };

        let mut first = Parser::new(scan("a;"));
        first.parse().unwrap();

        let mut second = Parser::resuming_from(scan("b;"), first.next_node_id());
        let statements = second.parse().unwrap();

        let Stmt::Expression(Expr::Variable { id, .. }) = &statements[0] else {
            panic!("expected variable expression");
        };

        assert_eq!(*id, first.next_node_id());
        assert!(second.next_node_id() > first.next_node_id());
    }

    #[test]
    fn test_parser_15_invalid_assignment_target() {
        let errors = parse("1 + 2 = 3;").unwrap_err();

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("Invalid assignment target"));
    }

    /// Each broken statement reports one error; parsing recovers at statement
    /// boundaries and keeps going.
    #[test]
    fn test_parser_16_errors_accumulate_across_statements() {
        let errors = parse("var 1 = 2;\nprint ;\nvar ok = 3;").unwrap_err();

        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("Expected variable name"));
        assert!(errors[1].to_string().contains("Expected expression"));
    }

    #[test]
    fn test_parser_17_error_at_end_of_input() {
        let errors = parse("1 +").unwrap_err();

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains(" at end"));
    }

    #[test]
    fn test_parser_18_missing_semicolon() {
        let errors = parse("print 1").unwrap_err();

        assert!(errors[0].to_string().contains("Expected ';' after value"));
    }
}
