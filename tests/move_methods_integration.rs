//! End-to-end moves over an in-memory file system.

mod common;

use common::{engine_over, memory_fs, read};
use indoc::indoc;
use pretty_assertions::assert_eq;
use relocator::relocation::MergeStatus;
use relocator::{ErrorCode, MoveMethodsRequest, RelocationError};
use std::path::{Path, PathBuf};

const ADDER: &str = indoc! {"
    namespace Shop
    {
        public class A
        {
            private int Val = 1;

            public int Add(int x)
            {
                return x + Val;
            }

            public int Twice(int x)
            {
                return x * 2;
            }
        }
    }
"};

fn move_request(methods: &[&str]) -> MoveMethodsRequest {
    MoveMethodsRequest::new("/src/A.cs", "A", methods.iter().copied(), "B")
}

// ============================================================================
// Single moves
// ============================================================================

#[test]
fn test_private_field_becomes_parameter_and_method_static() {
    let fs = memory_fs(&[("/src/A.cs", ADDER)]);
    let mut engine = engine_over(&fs);

    let report = engine.move_methods(&move_request(&["Add"])).unwrap();

    let source = read(&fs, "/src/A.cs");
    assert!(source.contains("public int Add(int x)"));
    assert!(source.contains("return B.Add(Val, x);"));
    assert!(!source.contains("return x + Val;"));

    let target = read(&fs, "/src/B.cs");
    assert!(target.contains("namespace Shop"));
    assert!(target.contains("public class B"));
    assert!(target.contains("public static int Add(int val, int x)"));
    assert!(target.contains("return x + val;"));

    assert!(report.created_target_file);
    assert_eq!(report.target_file, PathBuf::from("/src/B.cs"));
    let moved = &report.moved[0];
    assert!(moved.made_static);
    assert!(!moved.needs_receiver_parameter);
    assert_eq!(moved.injected_parameters, vec!["val".to_string()]);
    assert!(moved.access_member.is_none());
    assert!(report.summary().contains("Add was made static"));
}

#[test]
fn test_target_in_the_same_file() {
    let source = indoc! {"
        namespace Shop
        {
            class A
            {
                private int Val = 1;

                public int Add(int x)
                {
                    return x + Val;
                }
            }

            class B
            {
            }
        }
    "};
    let fs = memory_fs(&[("/src/A.cs", source)]);
    let mut engine = engine_over(&fs);

    let report = engine.move_methods(&move_request(&["Add"])).unwrap();

    assert_eq!(report.target_file, PathBuf::from("/src/A.cs"));
    assert!(!report.created_target_file);
    assert!(fs.text("/src/B.cs").is_none());
    let text = read(&fs, "/src/A.cs");
    assert!(text.contains("return B.Add(Val, x);"));
    assert!(text.contains("public static int Add(int val, int x)"));
    let b = text.find("class B").unwrap();
    assert!(text[b..].contains("return x + val;"));
    assert_eq!(report.moved[0].merge, MergeStatus::Appended);
}

#[test]
fn test_base_call_leaves_wrapper_in_source() {
    let source = indoc! {"
        namespace Shop
        {
            public class Base
            {
                public virtual int Foo() { return 0; }
            }

            public class A : Base
            {
                public override int Foo()
                {
                    return base.Foo() + 1;
                }
            }
        }
    "};
    let fs = memory_fs(&[("/src/A.cs", source)]);
    let mut engine = engine_over(&fs);

    let report = engine.move_methods(&move_request(&["Foo"])).unwrap();

    let source = read(&fs, "/src/A.cs");
    assert!(source.contains("public override int Foo()"));
    assert!(source.contains("return _b.Foo(this);"));
    assert!(source.contains("public int BaseFoo()"));
    assert!(source.contains("return base.Foo();"));
    assert!(source.contains("private readonly B _b = new B();"));

    let target = read(&fs, "/src/B.cs");
    assert!(target.contains("@this.BaseFoo() + 1"));

    let moved = &report.moved[0];
    assert_eq!(moved.base_wrapper.as_deref(), Some("BaseFoo"));
    assert_eq!(moved.access_member.as_deref(), Some("_b"));
    assert!(moved.needs_receiver_parameter);
    assert!(!moved.made_static);
}

#[test]
fn test_visibility_widens_and_override_stays() {
    let source = indoc! {"
        public class Base
        {
            public virtual string Describe() { return \"\"; }
        }

        public class A : Base
        {
            public string Name { get; set; }

            public override string Describe()
            {
                return Name;
            }

            private int Square(int x)
            {
                return x * x;
            }
        }
    "};
    let target = indoc! {"
        public class B
        {
        }
    "};
    let fs = memory_fs(&[("/src/A.cs", source), ("/src/B.cs", target)]);
    let mut engine = engine_over(&fs);

    engine
        .move_methods(&move_request(&["Describe", "Square"]))
        .unwrap();

    let target = read(&fs, "/src/B.cs");
    assert!(target.contains("public override string Describe(A @this)"));
    assert!(target.contains("return @this.Name;"));
    assert!(target.contains("internal static int Square(int x)"));

    let source = read(&fs, "/src/A.cs");
    assert!(source.contains("public override string Describe()"));
    assert!(source.contains("return _b.Describe(this);"));
    assert!(source.contains("private int Square(int x)"));
    assert!(source.contains("return B.Square(x);"));
}

#[test]
fn test_existing_method_makes_merge_a_noop() {
    let target = indoc! {"
        namespace Shop
        {
            public class B
            {
                public static int Add(int val, int x) { return x + val; }
            }
        }
    "};
    let fs = memory_fs(&[("/src/A.cs", ADDER), ("/src/B.cs", target)]);
    let mut engine = engine_over(&fs);

    let report = engine.move_methods(&move_request(&["Add"])).unwrap();

    let note = report.moved[0].note().unwrap();
    assert!(note.contains("already declares 'Add'"));
    assert!(report.summary().contains("Note:"));
    assert_eq!(read(&fs, "/src/B.cs").matches("Add(").count(), 1);
    assert!(read(&fs, "/src/A.cs").contains("return B.Add(Val, x);"));
}

#[test]
fn test_lambda_parameter_named_like_a_field_leaves_the_field_injected() {
    let source = indoc! {"
        namespace Shop
        {
            public class A
            {
                private int count;

                public int F(int[] xs)
                {
                    var n = xs.Count(count => count > 0);
                    return n + count;
                }
            }
        }
    "};
    let fs = memory_fs(&[("/src/A.cs", source)]);
    let mut engine = engine_over(&fs);

    let report = engine.move_methods(&move_request(&["F"])).unwrap();

    let target = read(&fs, "/src/B.cs");
    assert!(target.contains("public static int F(int count2, int[] xs)"));
    assert!(target.contains("var n = xs.Count(count => count > 0);"));
    assert!(target.contains("return n + count2;"));
    assert!(read(&fs, "/src/A.cs").contains("return B.F(count, xs);"));
    assert_eq!(report.moved[0].injected_parameters, vec!["count2".to_string()]);
}

#[test]
fn test_block_local_hides_a_field_only_inside_its_block() {
    let source = indoc! {"
        public class A
        {
            private int v = 1;

            public int G(bool c)
            {
                if (c)
                {
                    int v = 3;
                    return v;
                }
                return v;
            }
        }
    "};
    let fs = memory_fs(&[("/src/A.cs", source)]);
    let mut engine = engine_over(&fs);

    engine.move_methods(&move_request(&["G"])).unwrap();

    let target = read(&fs, "/src/B.cs");
    assert!(target.contains("public static int G(int v2, bool c)"));
    assert!(target.contains("int v = 3;"));
    assert!(target.contains("return v;"));
    assert!(target.contains("return v2;"));
    assert!(read(&fs, "/src/A.cs").contains("return B.G(v, c);"));
}

#[test]
fn test_untouched_declarations_survive_byte_for_byte() {
    let source = indoc! {"
        namespace Shop
        {
            public class P { public int X; }

            public class A
            {
                private int Val = 1;

                public int Add(int x)
                {
                    return x + Val;
                }
            }

            public class Q
            {
                public int Y;
            }
        }
    "};
    let target = indoc! {"
        namespace Shop
        {
            public class Other { public int Z; }

            public class B
            {
            }
        }
    "};
    let fs = memory_fs(&[("/src/A.cs", source), ("/src/B.cs", target)]);
    let mut engine = engine_over(&fs);

    engine.move_methods(&move_request(&["Add"])).unwrap();

    let source = read(&fs, "/src/A.cs");
    assert!(source.starts_with("namespace Shop\n{\n    public class P { public int X; }\n\n    public class A\n"));
    assert!(source.ends_with("    public class Q\n    {\n        public int Y;\n    }\n}\n"));
    let target = read(&fs, "/src/B.cs");
    assert!(target.starts_with("namespace Shop\n{\n    public class Other { public int Z; }\n\n    public class B\n"));
    assert!(target.contains("public static int Add(int val, int x)"));
}

#[test]
fn test_access_member_follows_the_spacing_of_its_neighbors() {
    let source = indoc! {"
        public class A
        {
            public int X;
            public int Limit { get; set; }

            public int Capped(int x)
            {
                return Math.Min(x, Limit);
            }

            public int Echo(int x) { return x + X; }
        }
    "};
    let fs = memory_fs(&[("/src/A.cs", source)]);
    let mut engine = engine_over(&fs);

    engine
        .move_methods(&move_request(&["Capped", "Echo"]))
        .unwrap();

    let source = read(&fs, "/src/A.cs");
    assert!(source.contains(
        "    public int X;\n    private readonly B _b = new B();\n    public int Limit { get; set; }\n"
    ));
    assert!(source.contains("    public int Echo(int x) { return _b.Echo(this, x); }\n"));
}

#[test]
fn test_target_that_cannot_be_constructed_is_rejected() {
    let source = indoc! {"
        namespace Shop
        {
            public class A
            {
                public int Limit { get; set; }

                public int Capped(int x)
                {
                    return Math.Min(x, Limit);
                }
            }
        }
    "};
    let target = indoc! {"
        namespace Shop
        {
            public class B
            {
                public B(int seed) { }
            }
        }
    "};
    let fs = memory_fs(&[("/src/A.cs", source), ("/src/B.cs", target)]);
    let mut engine = engine_over(&fs);

    let err = engine.move_methods(&move_request(&["Capped"])).unwrap_err();

    assert_eq!(err.code(), ErrorCode::TARGET_CONFLICT);
    assert!(err.is_precondition());
    assert!(err.to_string().contains("no parameterless constructor"));
    assert_eq!(read(&fs, "/src/A.cs"), source);
    assert_eq!(read(&fs, "/src/B.cs"), target);
    assert!(engine.session().ledger.is_empty());
}

// ============================================================================
// Batches
// ============================================================================

#[test]
fn test_chain_moves_callees_first() {
    let source = indoc! {"
        public class A
        {
            public int Top(int x)
            {
                return Mid(x) + 1;
            }

            public int Mid(int x)
            {
                return Leaf(x) * 2;
            }

            public int Leaf(int x)
            {
                return x;
            }
        }
    "};
    let fs = memory_fs(&[("/src/A.cs", source)]);
    let mut engine = engine_over(&fs);

    let report = engine
        .move_methods(&move_request(&["Top", "Mid", "Leaf"]))
        .unwrap();

    assert_eq!(report.order, vec!["Leaf", "Mid", "Top"]);
    assert_eq!(report.moved.len(), 3);
    assert!(report.cycle_edges.is_empty());
    assert!(read(&fs, "/src/A.cs").contains("return B.Leaf(x);"));
    let target = read(&fs, "/src/B.cs");
    for name in ["Top(", "Mid(", "Leaf("] {
        assert!(target.contains(name), "{name} missing from target");
    }
}

#[test]
fn test_mutual_recursion_is_ordered_in_batch_order() {
    let source = indoc! {"
        public class A
        {
            public bool IsEven(int n)
            {
                return n == 0 || IsOdd(n - 1);
            }

            public bool IsOdd(int n)
            {
                return n != 0 && IsEven(n - 1);
            }
        }
    "};
    let fs = memory_fs(&[("/src/A.cs", source)]);
    let mut engine = engine_over(&fs);

    let report = engine
        .move_methods(&move_request(&["IsEven", "IsOdd"]))
        .unwrap();

    assert_eq!(report.order, vec!["IsEven", "IsOdd"]);
    assert_eq!(
        report.cycle_edges,
        vec![("IsEven".to_string(), "IsOdd".to_string())]
    );
}

#[test]
fn test_second_move_of_same_method_is_rejected() {
    let fs = memory_fs(&[("/src/A.cs", ADDER)]);
    let mut engine = engine_over(&fs);
    engine.move_methods(&move_request(&["Add"])).unwrap();
    let source = read(&fs, "/src/A.cs");
    let target = read(&fs, "/src/B.cs");

    let err = engine.move_methods(&move_request(&["Add"])).unwrap_err();

    assert_eq!(err.code(), ErrorCode::ALREADY_MOVED);
    assert!(err.to_string().contains("inline-method"));
    assert_eq!(read(&fs, "/src/A.cs"), source);
    assert_eq!(read(&fs, "/src/B.cs"), target);
}

#[test]
fn test_reset_session_forgets_moves() {
    let fs = memory_fs(&[("/src/A.cs", ADDER)]);
    let mut engine = engine_over(&fs);
    engine.move_methods(&move_request(&["Add"])).unwrap();
    assert!(engine
        .session()
        .ledger
        .contains(Path::new("/src/./A.cs"), "Add"));

    engine.reset_session();

    assert!(engine.session().ledger.is_empty());
}

#[test]
fn test_invalid_batch_writes_nothing() {
    let fs = memory_fs(&[("/src/A.cs", ADDER)]);
    let mut engine = engine_over(&fs);

    let err = engine
        .move_methods(&move_request(&["Add", "Missing"]))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::METHOD_NOT_FOUND);

    let err = engine
        .move_methods(&move_request(&["Add", "Add"]))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DUPLICATE_IN_BATCH);

    let err = engine
        .move_methods(&MoveMethodsRequest::new("/src/A.cs", "A", ["Add"], "A"))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TARGET_CONFLICT);

    assert_eq!(read(&fs, "/src/A.cs"), ADDER);
    assert!(fs.text("/src/B.cs").is_none());
    assert!(engine.session().ledger.is_empty());
}

const WITH_OVERRIDE: &str = indoc! {"
    public class Base
    {
        protected virtual int Hidden() { return 0; }
    }

    public class A : Base
    {
        public int Add(int x)
        {
            return x;
        }

        protected override int Hidden()
        {
            return 1;
        }

        public int Sub(int x)
        {
            return -x;
        }
    }
"};

#[test]
fn test_failing_move_keeps_the_moves_before_it() {
    let fs = memory_fs(&[("/src/A.cs", WITH_OVERRIDE)]);
    let mut engine = engine_over(&fs);

    let err = engine
        .move_methods(&move_request(&["Add", "Hidden", "Sub"]))
        .unwrap_err();

    match &err {
        RelocationError::PartialBatch {
            completed,
            failed,
            cause,
            skipped,
        } => {
            assert_eq!(completed, &vec!["Add".to_string()]);
            assert_eq!(failed, "Hidden");
            assert_eq!(cause.code(), ErrorCode::RESTRICTED_OVERRIDE);
            assert_eq!(skipped, &vec!["Sub".to_string()]);
        }
        other => panic!("expected a partial batch, got {other:?}"),
    }
    assert_eq!(err.root_cause().code(), ErrorCode::RESTRICTED_OVERRIDE);

    let source = read(&fs, "/src/A.cs");
    assert!(source.contains("return B.Add(x);"));
    assert!(source.contains("protected override int Hidden()\n    {\n        return 1;"));
    assert!(source.contains("return -x;"));
    let target = read(&fs, "/src/B.cs");
    assert!(target.contains("public static int Add(int x)"));
    assert!(!target.contains("Hidden"));
    assert!(!target.contains("Sub"));

    let ledger = &engine.session().ledger;
    assert!(ledger.contains(Path::new("/src/A.cs"), "Add"));
    assert!(!ledger.contains(Path::new("/src/A.cs"), "Hidden"));
}

#[test]
fn test_failing_first_move_writes_nothing() {
    let fs = memory_fs(&[("/src/A.cs", WITH_OVERRIDE)]);
    let mut engine = engine_over(&fs);

    let err = engine
        .move_methods(&move_request(&["Hidden", "Add"]))
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::RESTRICTED_OVERRIDE);
    assert!(err.is_precondition());
    assert_eq!(read(&fs, "/src/A.cs"), WITH_OVERRIDE);
    assert!(fs.text("/src/B.cs").is_none());
    assert!(engine.session().ledger.is_empty());
}

#[test]
fn test_failed_target_write_reports_partial_batch() {
    let fs = memory_fs(&[("/src/A.cs", ADDER)]);
    fs.fail_writes_after("/src/B.cs", 1);
    let mut engine = engine_over(&fs);

    let err = engine
        .move_methods(&move_request(&["Add", "Twice"]))
        .unwrap_err();

    match &err {
        RelocationError::PartialBatch {
            completed,
            failed,
            cause,
            skipped,
        } => {
            assert_eq!(completed, &vec!["Add".to_string()]);
            assert_eq!(failed, "Twice");
            assert_eq!(cause.code(), ErrorCode::IO_WRITE);
            assert!(skipped.is_empty());
        }
        other => panic!("expected a partial batch, got {other:?}"),
    }
    let ledger = &engine.session().ledger;
    assert!(ledger.contains(Path::new("/src/A.cs"), "Add"));
    assert!(!ledger.contains(Path::new("/src/A.cs"), "Twice"));
    assert!(read(&fs, "/src/A.cs").contains("return B.Twice(x);"));
    assert!(!read(&fs, "/src/B.cs").contains("Twice"));
}

#[test]
fn test_first_write_failure_is_reported_as_is() {
    let fs = memory_fs(&[("/src/A.cs", ADDER)]);
    fs.fail_writes_to("/src/A.cs");
    let mut engine = engine_over(&fs);

    let err = engine.move_methods(&move_request(&["Add"])).unwrap_err();

    assert_eq!(err.code(), ErrorCode::IO_WRITE);
    assert!(engine.session().ledger.is_empty());
}

// ============================================================================
// Program mode
// ============================================================================

#[test]
fn test_loaded_program_finds_target_file() {
    let target = indoc! {"
        namespace Shop.Models
        {
            public class B
            {
            }
        }
    "};
    let fs = memory_fs(&[("/src/A.cs", ADDER), ("/src/Models/B.cs", target)]);
    let mut engine = engine_over(&fs);

    assert_eq!(engine.load_directory(Path::new("/src")).unwrap(), 2);
    let report = engine.move_methods(&move_request(&["Add"])).unwrap();

    assert_eq!(report.target_file, PathBuf::from("/src/Models/B.cs"));
    let target = read(&fs, "/src/Models/B.cs");
    assert!(target.contains("using Shop;"));
    assert!(target.contains("public static int Add(int val, int x)"));
}

#[test]
fn test_target_declared_elsewhere_conflicts() {
    let target = "public class B\n{\n}\n";
    let fs = memory_fs(&[("/src/A.cs", ADDER), ("/src/Models/B.cs", target)]);
    let mut engine = engine_over(&fs);
    engine.load_directory(Path::new("/src")).unwrap();

    let err = engine
        .move_methods(&move_request(&["Add"]).with_target_file("/src/Other.cs"))
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::TARGET_CONFLICT);
    assert!(fs.text("/src/Other.cs").is_none());
}
