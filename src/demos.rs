//! Built-in demonstration scripts

/// A named script shipped with the binary
#[derive(Debug, Clone, Copy)]
pub struct Demo {
    pub title: &'static str,
    pub source: &'static str,
}

pub static DEMOS: &[Demo] = &[
    Demo {
        title: "Raw pointer: memory leak",
        source: "\
// Raw pointer: memory leak
int main() {
    int* ptr = new int;
    // no delete before returning
    return 0;
}
",
    },
    Demo {
        title: "Raw pointer: proper delete",
        source: "\
// Raw pointer: proper delete
int main() {
    int* ptr = new int;
    delete ptr;
    return 0;
}
",
    },
    Demo {
        title: "unique_ptr: automatic cleanup",
        source: "\
// unique_ptr: automatic cleanup
int main() {
    std::unique_ptr<int> ptr = std::make_unique<int>();
    return 0;
}
",
    },
    Demo {
        title: "shared_ptr: reference counting",
        source: "\
// shared_ptr: reference counting
int main() {
    std::shared_ptr<int> ptr1 = std::make_shared<int>();
    std::shared_ptr<int> ptr2 = ptr1;
    // two owners now share one block
    return 0;
}
",
    },
    Demo {
        title: "Dangling pointer",
        source: "\
// Dangling pointer
int main() {
    int* ptr1 = new int;
    int* ptr2 = ptr1;
    delete ptr1;
    // ptr2 still names the freed block
    return 0;
}
",
    },
    Demo {
        title: "Stack vs heap",
        source: "\
// Stack vs heap
int main() {
    int stackVar = 5;
    int* heapPtr = new int;
    delete heapPtr;
    return 0;
}
",
    },
    Demo {
        title: "Basic class",
        source: "\
// Basic class
class Point {
public:
    int x;
    int y;
};

int main() {
    Point p1;
    Point* p2 = new Point();
    delete p2;
    return 0;
}
",
    },
    Demo {
        title: "Class with smart pointers",
        source: "\
// Class with smart pointers
class Player {
public:
    int health;
    int mana;
};

int main() {
    Player p1;
    std::unique_ptr<Player> p2 = std::make_unique<Player>();
    std::shared_ptr<Player> p3 = std::make_shared<Player>();
    return 0;
}
",
    },
    Demo {
        title: "Nested class",
        source: "\
// Nested class
class Vector {
public:
    int x;
    int y;
};

class Entity {
public:
    Vector position;
    int id;
};

int main() {
    Entity e;
    return 0;
}
",
    },
];

/// Demo by 1-based number, as listed by `--list`
pub fn get(number: usize) -> Option<&'static Demo> {
    number.checked_sub(1).and_then(|index| DEMOS.get(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbering_is_one_based() {
        assert!(get(0).is_none());
        assert_eq!(get(1).map(|d| d.title), Some("Raw pointer: memory leak"));
        assert!(get(DEMOS.len()).is_some());
        assert!(get(DEMOS.len() + 1).is_none());
    }
}
