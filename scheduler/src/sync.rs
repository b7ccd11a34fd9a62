//! Simulated synchronization primitives.
//!
//! These are data, not locks: the stepper inspects and mutates them while it
//! advances simulated time. Waiters are identified by pid only.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::Pid;

/// Counting semaphore with a FIFO wait list
#[derive(Clone, Debug)]
pub struct Semaphore {
    name: String,
    count: u32,
    waiters: VecDeque<Pid>,
}

impl Semaphore {
    pub fn new(name: &str, initial: u32) -> Semaphore {
        Semaphore {
            name: name.to_string(),
            count: initial,
            waiters: VecDeque::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn waiters(&self) -> impl Iterator<Item = Pid> + '_ {
        self.waiters.iter().copied()
    }

    /// Takes one unit for `pid`
    ///
    /// Returns `true` if acquired, `false` if `pid` was queued as a waiter.
    pub fn wait(&mut self, pid: Pid) -> bool {
        if self.count > 0 {
            self.count -= 1;
            return true;
        }

        self.waiters.push_back(pid);
        false
    }

    /// Hands the unit to the oldest waiter, which is returned so the caller
    /// can make it ready again; with no waiter the count goes up
    pub fn signal(&mut self) -> Option<Pid> {
        let woken = self.waiters.pop_front();
        if woken.is_none() {
            self.count += 1;
        }

        woken
    }

    fn forget(&mut self, pid: Pid) {
        self.waiters.retain(|&waiter| waiter != pid);
    }
}

/// Mutex with an owner and a FIFO wait list
#[derive(Clone, Debug)]
pub struct Mutex {
    name: String,
    owner: Option<Pid>,
    waiters: VecDeque<Pid>,
}

impl Mutex {
    pub fn new(name: &str) -> Mutex {
        Mutex {
            name: name.to_string(),
            owner: None,
            waiters: VecDeque::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> Option<Pid> {
        self.owner
    }

    pub fn waiters(&self) -> impl Iterator<Item = Pid> + '_ {
        self.waiters.iter().copied()
    }

    /// Returns `true` if `pid` holds the lock afterwards; the owner locking
    /// again succeeds without blocking. Otherwise `pid` is queued.
    pub fn try_lock(&mut self, pid: Pid) -> bool {
        match self.owner {
            None => {
                self.owner = Some(pid);
                true
            }
            Some(owner) if owner == pid => true,
            Some(_) => {
                self.waiters.push_back(pid);
                false
            }
        }
    }

    /// Passes ownership to the oldest waiter and returns it, or frees the lock
    pub fn unlock(&mut self) -> Option<Pid> {
        self.owner = self.waiters.pop_front();
        self.owner
    }
}

/// Owns the named primitives of a run and detects deadlocks on them
#[derive(Clone, Debug, Default)]
pub struct SyncManager {
    semaphores: BTreeMap<String, Semaphore>,
    mutexes: BTreeMap<String, Mutex>,
}

impl SyncManager {
    pub fn new() -> SyncManager {
        SyncManager::default()
    }

    /// Returns the semaphore called `name`, creating it with `initial` units
    pub fn semaphore(&mut self, name: &str, initial: u32) -> &mut Semaphore {
        self.semaphores
            .entry(name.to_string())
            .or_insert_with(|| Semaphore::new(name, initial))
    }

    /// Returns the mutex called `name`, creating it unlocked
    pub fn mutex(&mut self, name: &str) -> &mut Mutex {
        self.mutexes
            .entry(name.to_string())
            .or_insert_with(|| Mutex::new(name))
    }

    pub fn get_semaphore(&self, name: &str) -> Option<&Semaphore> {
        self.semaphores.get(name)
    }

    pub fn get_mutex(&self, name: &str) -> Option<&Mutex> {
        self.mutexes.get(name)
    }

    pub fn semaphore_mut(&mut self, name: &str) -> Option<&mut Semaphore> {
        self.semaphores.get_mut(name)
    }

    pub fn mutex_mut(&mut self, name: &str) -> Option<&mut Mutex> {
        self.mutexes.get_mut(name)
    }

    /// Builds the wait-for graph: an edge from every mutex waiter to the
    /// holder of that mutex
    pub fn wait_for_graph(&self) -> BTreeMap<Pid, BTreeSet<Pid>> {
        let mut graph: BTreeMap<Pid, BTreeSet<Pid>> = BTreeMap::new();

        for mutex in self.mutexes.values() {
            for waiter in mutex.waiters() {
                let edges = graph.entry(waiter).or_default();
                if let Some(holder) = mutex.owner().filter(|&holder| holder != waiter) {
                    edges.insert(holder);
                }
            }
        }

        graph
    }

    /// Returns the pids of the first cycle in the wait-for graph, in path
    /// order, or an empty vector when nobody is deadlocked
    pub fn detect_deadlock(&self) -> Vec<Pid> {
        let graph = self.wait_for_graph();
        let mut visited: BTreeSet<Pid> = BTreeSet::new();
        let mut path: Vec<Pid> = Vec::new();

        for &node in graph.keys() {
            if visited.contains(&node) {
                continue;
            }

            if let Some(cycle) = find_cycle(&graph, node, &mut visited, &mut path) {
                return cycle;
            }
        }

        Vec::new()
    }

    /// Drops `pid` from every wait list and releases the mutexes it holds
    ///
    /// Returns the processes that were handed a mutex as a result.
    pub fn release_process(&mut self, pid: Pid) -> Vec<Pid> {
        for semaphore in self.semaphores.values_mut() {
            semaphore.forget(pid);
        }

        let mut woken = Vec::new();
        for mutex in self.mutexes.values_mut() {
            mutex.waiters.retain(|&waiter| waiter != pid);

            if mutex.owner == Some(pid) {
                woken.extend(mutex.unlock());
            }
        }

        woken
    }
}

/// Depth-first search keeping the current path as the recursion stack
fn find_cycle(
    graph: &BTreeMap<Pid, BTreeSet<Pid>>,
    node: Pid,
    visited: &mut BTreeSet<Pid>,
    path: &mut Vec<Pid>,
) -> Option<Vec<Pid>> {
    visited.insert(node);
    path.push(node);

    for &next in graph.get(&node).into_iter().flatten() {
        if let Some(start) = path.iter().position(|&on_path| on_path == next) {
            return Some(path[start..].to_vec());
        }

        if !visited.contains(&next) {
            if let Some(cycle) = find_cycle(graph, next, visited, path) {
                return Some(cycle);
            }
        }
    }

    path.pop();
    None
}
