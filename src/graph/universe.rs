/// Disjoint-set forest over dense node ids with path compression and union
/// by rank. Component sizes are tracked at the roots.
#[derive(Clone, Debug)]
pub struct Universe {
    parent: Vec<u32>,
    rank: Vec<u8>,
    size: Vec<u32>,
}

impl Universe {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
            rank: vec![0; n],
            size: vec![1; n],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn find(&mut self, x: u32) -> u32 {
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        let mut cur = x;
        while self.parent[cur as usize] != root {
            let next = self.parent[cur as usize];
            self.parent[cur as usize] = root;
            cur = next;
        }
        root
    }

    /// Merges two roots; returns the root of the merged component.
    pub fn join(&mut self, a: u32, b: u32) -> u32 {
        if a == b {
            return a;
        }
        let (ra, rb) = (self.rank[a as usize], self.rank[b as usize]);
        let (root, child) = if ra < rb { (b, a) } else { (a, b) };
        self.parent[child as usize] = root;
        self.size[root as usize] += self.size[child as usize];
        if ra == rb {
            self.rank[root as usize] += 1;
        }
        root
    }

    /// Size of the component rooted at `root`.
    pub fn size(&self, root: u32) -> u32 {
        self.size[root as usize]
    }
}
